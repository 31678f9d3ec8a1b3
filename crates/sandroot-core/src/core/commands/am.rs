//! `bin/am`: activity-manager shim speaking the command-file / result-file exchange.

pub(crate) const AM_VERSION: &str = "0.9.0-sandroot";

pub(crate) const AM_SHIM: &str = r##"if [ "$1" = "--version" ]; then
    echo "@AM_VERSION@"
    exit 0
fi
STATE_DIR="@HOME@/.termux"
CMD_FILE="$STATE_DIR/am_command"
RESULT_FILE="$STATE_DIR/am_result"
URL_FILE="$STATE_DIR/url_to_open"
mkdir -p "$STATE_DIR"

if [ "$1" = "start" ]; then
    IS_VIEW=0
    DATA=""
    PREV=""
    for arg in "$@"; do
        case "$arg" in
            android.intent.action.VIEW) IS_VIEW=1 ;;
        esac
        if [ "$PREV" = "-d" ]; then
            DATA="$arg"
        fi
        PREV="$arg"
    done
    if [ "$IS_VIEW" = "1" ] && [ -n "$DATA" ]; then
        echo "$DATA" > "$URL_FILE"
        echo "Starting: Intent { act=android.intent.action.VIEW dat=$DATA }"
        exit 0
    fi
fi

rm -f "$RESULT_FILE"
echo "$@" > "$CMD_FILE"
WAIT=0
while [ ! -f "$RESULT_FILE" ] && [ "$WAIT" -lt 30 ]; do
    sleep 0.1
    WAIT=$((WAIT + 1))
done
if [ -f "$RESULT_FILE" ]; then
    EXIT_CODE="$(head -1 "$RESULT_FILE")"
    tail -n +2 "$RESULT_FILE"
    rm -f "$RESULT_FILE"
    exit "${EXIT_CODE:-0}"
fi
echo "Error: Command timed out (service may not be running)" >&2
exit 1
"##;
