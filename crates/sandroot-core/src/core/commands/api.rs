//! Fire-and-collect wrappers. Each script defines `sandroot_call`, which drops a request into
//! the spool directory, sleeps, and prints the result file if the receiver produced one.

/// Shell side of the request/result exchange; mirrors [`super::rpc`].
pub(crate) const CALL_FUNCTION: &str = r##"sandroot_call() {
    local method="$1" args="$2" wait="${3:-@WAIT@}"
    local spool="@SPOOL@"
    local result="@TMP@/api_result_$$"
    local request="$spool/req_$$_$RANDOM"
    mkdir -p "$spool"
    rm -f "$result"
    printf 'method=%s\nresult=%s\nargs=%s' "$method" "$result" "$args" > "$request.tmp"
    mv -f "$request.tmp" "$request.req"
    sleep "$wait"
    if [ -f "$result" ]; then
        cat "$result"
        rm -f "$result"
        return 0
    fi
    rm -f "$request.req"
    return 1
}
"##;

/// `(script, method, argument expression)` for wrappers that forward their arguments as-is.
pub(crate) const SIMPLE: &[(&str, &str, &str)] = &[
    ("termux-clipboard-get", "clipboard-get", r#""""#),
    ("termux-clipboard-set", "clipboard-set", r#""$*""#),
    ("termux-toast", "toast", r#""$*""#),
    ("termux-notification-remove", "notification-remove", r#""$1""#),
    ("termux-battery-status", "battery-status", r#""""#),
    ("termux-vibrate", "vibrate", r#""${1:-1000}""#),
    ("termux-brightness", "brightness", r#""""#),
    ("termux-torch", "torch", r#""${1:-on}""#),
    ("termux-volume", "volume", r#""""#),
    ("termux-audio-info", "audio-info", r#""""#),
    ("termux-wifi-connectioninfo", "wifi-connectioninfo", r#""""#),
    ("termux-wifi-enable", "wifi-enable", r#""$1""#),
    ("termux-wifi-scaninfo", "wifi-scaninfo", r#""""#),
    ("termux-location", "location", r#""""#),
    ("termux-camera-info", "camera-info", r#""""#),
    ("termux-media-scan", "media-scan", r#""$1""#),
    ("termux-tts-engines", "tts-engines", r#""""#),
    ("termux-tts-speak", "tts-speak", r#""$*""#),
    ("termux-telephony-call", "telephony-call", r#""$1""#),
    ("termux-telephony-cellinfo", "telephony-cellinfo", r#""""#),
    ("termux-telephony-deviceinfo", "telephony-deviceinfo", r#""""#),
    ("termux-contact-list", "contact-list", r#""""#),
    ("termux-fingerprint", "fingerprint", r#""""#),
    ("termux-infrared-frequencies", "infrared-frequencies", r#""""#),
    ("termux-usb", "usb", r#""""#),
    ("termux-wallpaper", "wallpaper", r#""$1""#),
    ("termux-storage-get", "storage-get", r#""$1""#),
    ("termux-job-scheduler", "job-scheduler", r#""$*""#),
    ("termux-bluetooth-info", "bluetooth-info", r#""""#),
    ("termux-bluetooth-enable", "bluetooth-enable", r#""${1:-on}""#),
    ("termux-bluetooth-scaninfo", "bluetooth-scaninfo", r#""""#),
    ("termux-keystore-list", "keystore-list", r#""""#),
    ("termux-nfc", "nfc", r#""""#),
    ("termux-notification-list", "notification-list", r#""""#),
    ("termux-speech-to-text", "speech-to-text", r#""""#),
    ("termux-saf-dirs", "saf-dirs", r#""""#),
];

/// Wrappers that shape their arguments before the call.
pub(crate) const SHAPED: &[(&str, &str)] = &[
    (
        "termux-notification",
        r##"TITLE="sandroot"
CONTENT=""
ID=""
while getopts "t:c:i:" opt; do
    case $opt in
        t) TITLE="$OPTARG" ;;
        c) CONTENT="$OPTARG" ;;
        i) ID="$OPTARG" ;;
    esac
done
sandroot_call "notification" "$TITLE|$CONTENT|$ID" || true
"##,
    ),
    (
        "termux-camera-photo",
        r##"CAMERA_ID=0
OUTPUT_FILE=""
while getopts "c:o:" opt; do
    case $opt in
        c) CAMERA_ID="$OPTARG" ;;
        o) OUTPUT_FILE="$OPTARG" ;;
    esac
done
if [ -z "$OUTPUT_FILE" ]; then
    echo "Usage: termux-camera-photo -o <output_file> [-c camera_id]"
    exit 1
fi
sandroot_call "camera-photo" "$CAMERA_ID|$OUTPUT_FILE" "@SLOW_WAIT@" || true
"##,
    ),
    (
        "termux-media-player",
        r##"ACTION="$1"
FILE="$2"
sandroot_call "media-player" "$ACTION|$FILE" || true
"##,
    ),
    (
        "termux-microphone-record",
        r##"ACTION="start"
FILE=""
LIMIT=0
while getopts "d:f:l:q" opt; do
    case $opt in
        f) FILE="$OPTARG" ;;
        l) LIMIT="$OPTARG" ;;
        d) ;;
        q) ACTION="stop" ;;
    esac
done
if [ "$ACTION" = "start" ] && [ -z "$FILE" ]; then
    echo "Usage: termux-microphone-record -f <file> [-l limit_secs]"
    exit 1
fi
sandroot_call "microphone-record" "$ACTION|$FILE|$LIMIT" || true
"##,
    ),
    (
        "termux-sms-list",
        r##"TYPE="inbox"
LIMIT=10
while getopts "t:l:o:n:" opt; do
    case $opt in
        t) TYPE="$OPTARG" ;;
        l) LIMIT="$OPTARG" ;;
        o) ;;
        n) LIMIT="$OPTARG" ;;
    esac
done
sandroot_call "sms-list" "$TYPE|$LIMIT" || true
"##,
    ),
    (
        "termux-sms-send",
        r##"NUMBER=""
while getopts "n:" opt; do
    case $opt in
        n) NUMBER="$OPTARG" ;;
    esac
done
shift $((OPTIND-1))
MESSAGE="$*"
if [ -z "$NUMBER" ] || [ -z "$MESSAGE" ]; then
    echo "Usage: termux-sms-send -n <number> <message>"
    exit 1
fi
sandroot_call "sms-send" "$NUMBER|$MESSAGE" || true
"##,
    ),
    (
        "termux-call-log",
        r##"LIMIT=10
while getopts "l:o:n:" opt; do
    case $opt in
        l) LIMIT="$OPTARG" ;;
        n) LIMIT="$OPTARG" ;;
        o) ;;
    esac
done
sandroot_call "call-log" "$LIMIT" || true
"##,
    ),
    (
        "termux-sensor",
        r##"SENSOR_TYPE=""
LIST_SENSORS=""
while getopts "s:ln:d:c:" opt; do
    case $opt in
        s) SENSOR_TYPE="$OPTARG" ;;
        l) LIST_SENSORS="list" ;;
        n|d|c) ;;
    esac
done
if [ -n "$LIST_SENSORS" ]; then
    ARGS="list"
else
    ARGS="$SENSOR_TYPE"
fi
sandroot_call "sensor" "$ARGS" || true
"##,
    ),
    (
        "termux-infrared-transmit",
        r##"FREQ=""
while getopts "f:" opt; do
    case $opt in
        f) FREQ="$OPTARG" ;;
    esac
done
shift $((OPTIND-1))
PATTERN="$*"
if [ -z "$FREQ" ]; then
    echo "Usage: termux-infrared-transmit -f <frequency> <pattern...>"
    exit 1
fi
sandroot_call "infrared-transmit" "$FREQ,$PATTERN" || true
"##,
    ),
    (
        "termux-download",
        r##"TITLE="Download"
DESC=""
while getopts "t:d:" opt; do
    case $opt in
        t) TITLE="$OPTARG" ;;
        d) DESC="$OPTARG" ;;
    esac
done
shift $((OPTIND-1))
URL="$1"
if [ -z "$URL" ]; then
    echo "Usage: termux-download [-t title] [-d description] <url>"
    exit 1
fi
sandroot_call "download" "$URL|$TITLE|$DESC" || true
"##,
    ),
    (
        "termux-share",
        r##"ACTION="text"
while getopts "a:" opt; do
    case $opt in
        a) ACTION="$OPTARG" ;;
    esac
done
shift $((OPTIND-1))
if [ -n "$1" ]; then
    CONTENT="$1"
else
    CONTENT=$(cat)
fi
sandroot_call "share" "$ACTION|$CONTENT" || true
"##,
    ),
    (
        "termux-dialog",
        r##"TITLE="Input"
HINT=""
while getopts "t:i:" opt; do
    case $opt in
        t) TITLE="$OPTARG" ;;
        i) HINT="$OPTARG" ;;
    esac
done
sandroot_call "dialog" "$TITLE|$HINT" "@SLOW_WAIT@" || true
"##,
    ),
    (
        "termux-wake-lock",
        r##"sandroot_call "wake-lock" "acquire" || echo "Wake lock acquired"
"##,
    ),
    (
        "termux-wake-unlock",
        r##"sandroot_call "wake-lock" "release" || echo "Wake lock released"
"##,
    ),
    (
        "termux-bluetooth-connect",
        r##"if [ -z "$1" ]; then
    echo "Usage: termux-bluetooth-connect <mac_address>"
    exit 1
fi
sandroot_call "bluetooth-connect" "$1" "@SLOW_WAIT@" || true
"##,
    ),
    (
        "termux-bluetooth-paired",
        r##"sandroot_call "bluetooth-paired" "" || true
"##,
    ),
    (
        "termux-keystore",
        r##"COMMAND="$1"
[ $# -gt 0 ] && shift
case "$COMMAND" in
    list)
        sandroot_call "keystore-list" "" || true
        ;;
    generate)
        ALIAS=""
        ALGORITHM="AES"
        SIZE=256
        while getopts "a:g:s:" opt; do
            case $opt in
                a) ALIAS="$OPTARG" ;;
                g) ALGORITHM="$OPTARG" ;;
                s) SIZE="$OPTARG" ;;
            esac
        done
        if [ -z "$ALIAS" ]; then
            echo "Usage: termux-keystore generate -a <alias> [-g algorithm] [-s size]"
            exit 1
        fi
        sandroot_call "keystore-generate" "$ALIAS|$ALGORITHM|$SIZE" || true
        ;;
    delete)
        if [ -z "$1" ]; then
            echo "Usage: termux-keystore delete <alias>"
            exit 1
        fi
        sandroot_call "keystore-delete" "$1" || true
        ;;
    sign)
        ALIAS=""
        DATA=""
        while getopts "a:d:" opt; do
            case $opt in
                a) ALIAS="$OPTARG" ;;
                d) DATA="$OPTARG" ;;
            esac
        done
        if [ -z "$ALIAS" ] || [ -z "$DATA" ]; then
            echo "Usage: termux-keystore sign -a <alias> -d <data>"
            exit 1
        fi
        sandroot_call "keystore-sign" "$ALIAS|$DATA" || true
        ;;
    verify)
        ALIAS=""
        SIGNATURE=""
        IV=""
        while getopts "a:s:i:" opt; do
            case $opt in
                a) ALIAS="$OPTARG" ;;
                s) SIGNATURE="$OPTARG" ;;
                i) IV="$OPTARG" ;;
            esac
        done
        if [ -z "$ALIAS" ] || [ -z "$SIGNATURE" ] || [ -z "$IV" ]; then
            echo "Usage: termux-keystore verify -a <alias> -s <signature> -i <iv>"
            exit 1
        fi
        sandroot_call "keystore-verify" "$ALIAS|$SIGNATURE|$IV" || true
        ;;
    *)
        echo "Usage: termux-keystore <command> [args]"
        echo "Commands:"
        echo "  list                               List all keys in the keystore"
        echo "  generate -a <alias>                Generate a new key"
        echo "  delete <alias>                     Delete a key"
        echo "  sign -a <alias> -d <data>          Sign data with a key"
        echo "  verify -a <alias> -s <sig> -i <iv> Verify signature"
        exit 1
        ;;
esac
"##,
    ),
    (
        "termux-saf-ls",
        r##"if [ -z "$1" ]; then
    echo "Usage: termux-saf-ls <document_uri>"
    echo "Use termux-saf-managedir to get a directory URI first"
    exit 1
fi
sandroot_call "saf-ls" "$1" || true
"##,
    ),
    (
        "termux-saf-stat",
        r##"if [ -z "$1" ]; then
    echo "Usage: termux-saf-stat <document_uri>"
    exit 1
fi
sandroot_call "saf-stat" "$1" || true
"##,
    ),
    (
        "termux-saf-read",
        r##"if [ -z "$1" ]; then
    echo "Usage: termux-saf-read <document_uri>"
    exit 1
fi
sandroot_call "saf-read" "$1" || true
"##,
    ),
    (
        "termux-saf-write",
        r##"if [ -z "$1" ]; then
    echo "Usage: termux-saf-write <document_uri> [content]"
    echo "If no content provided, reads from stdin"
    exit 1
fi
URI="$1"
shift
if [ -n "$*" ]; then
    CONTENT="$*"
else
    CONTENT=$(cat)
fi
sandroot_call "saf-write" "$URI|$CONTENT" || true
"##,
    ),
    (
        "termux-saf-mkdir",
        r##"if [ -z "$1" ] || [ -z "$2" ]; then
    echo "Usage: termux-saf-mkdir <parent_uri> <directory_name>"
    exit 1
fi
sandroot_call "saf-mkdir" "$1|$2" || true
"##,
    ),
    (
        "termux-saf-rm",
        r##"if [ -z "$1" ]; then
    echo "Usage: termux-saf-rm <document_uri>"
    exit 1
fi
sandroot_call "saf-rm" "$1" || true
"##,
    ),
    (
        "termux-saf-create",
        r##"MIME="text/plain"
while getopts "m:" opt; do
    case $opt in
        m) MIME="$OPTARG" ;;
    esac
done
shift $((OPTIND-1))
if [ -z "$1" ] || [ -z "$2" ]; then
    echo "Usage: termux-saf-create [-m mime_type] <parent_uri> <file_name>"
    exit 1
fi
sandroot_call "saf-create" "$1|$2|$MIME" || true
"##,
    ),
];

/// Body of a wrapper that forwards `args` unchanged.
pub(crate) fn simple_body(method: &str, args: &str) -> String {
    format!("sandroot_call \"{method}\" {args} || true\n")
}
