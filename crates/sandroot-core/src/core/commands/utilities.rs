//! Stateful helper scripts that never go through the request spool.

/// `(script, body)`. Bodies are expanded against the sandbox paths before the stamp is added.
pub(crate) const UTILITIES: &[(&str, &str)] = &[
    (
        "termux-open-url",
        r##"if [ $# -lt 1 ]; then
    echo 'usage: termux-open-url <url>'
    echo 'Open a URL in browser.'
    exit 1
fi
URL="$1"
mkdir -p "@HOME@/.termux"
echo "$URL" > "@HOME@/.termux/url_to_open"
echo "Opening: $URL"
sleep 1
"##,
    ),
    (
        "termux-open",
        r##"set -e -u
SCRIPTNAME=termux-open
show_usage () {
    echo "Usage: $SCRIPTNAME [options] path-or-url"
    echo "Open a file or URL in an external app."
    echo "  --send               if the file should be shared for sending"
    echo "  --view               if the file should be shared for viewing (default)"
    echo "  --chooser            if an app chooser should always be shown"
    echo "  --content-type type  specify the content type to use"
    exit 0
}
TEMP=`getopt -n $SCRIPTNAME -o h --long send,view,chooser,content-type:,help -- "$@"`
eval set -- "$TEMP"
ACTION=android.intent.action.VIEW
EXTRAS=""
while true; do
    case "$1" in
        --send) ACTION="android.intent.action.SEND"; shift;;
        --view) ACTION="android.intent.action.VIEW"; shift;;
        --chooser) EXTRAS="$EXTRAS --ez chooser true"; shift;;
        --content-type) EXTRAS="$EXTRAS --es content-type $2"; shift 2;;
        -h | --help) show_usage;;
        --) shift; break ;;
    esac
done
if [ $# != 1 ]; then
    show_usage
fi
TARGET="$1"
case "$TARGET" in
    http://*|https://*|mailto:*|tel:*|sms:*|geo:*)
        mkdir -p "@HOME@/.termux"
        echo "$TARGET" > "@HOME@/.termux/url_to_open"
        sleep 1
        exit 0
        ;;
esac
if [ -f "$TARGET" ]; then
    TARGET=$(realpath "$TARGET")
fi
case "${TERMUX__USER_ID:-}" in ''|*[!0-9]*|0[0-9]*) TERMUX__USER_ID=0;; esac
am broadcast --user "$TERMUX__USER_ID" \
    -a "$ACTION" \
    -n "@PACKAGE@/@PACKAGE@.app.TermuxOpenReceiver" \
    $EXTRAS \
    -d "$TARGET" \
    > /dev/null 2>&1
"##,
    ),
    (
        "xdg-open",
        r##"URL="$1"
case "$URL" in
    http://*|https://*|mailto:*|tel:*|sms:*|geo:*)
        mkdir -p "@HOME@/.termux"
        echo "$URL" > "@HOME@/.termux/url_to_open"
        ;;
    *)
        exec termux-open "$@"
        ;;
esac
"##,
    ),
    (
        "sensible-browser",
        r##"mkdir -p "@HOME@/.termux"
echo "$1" > "@HOME@/.termux/url_to_open"
"##,
    ),
    (
        "open",
        r##"URL="$1"
case "$URL" in
    http://*|https://*|mailto:*|tel:*|sms:*|geo:*)
        mkdir -p "@HOME@/.termux"
        echo "$URL" > "@HOME@/.termux/url_to_open"
        ;;
    *)
        exec termux-open "$@"
        ;;
esac
"##,
    ),
    (
        "termux-setup-storage",
        r##"STORAGE_DIR="@HOME@/storage"
mkdir -p "$STORAGE_DIR"
ln -sf /sdcard "$STORAGE_DIR/shared"
ln -sf /sdcard/DCIM "$STORAGE_DIR/dcim"
ln -sf /sdcard/Download "$STORAGE_DIR/downloads"
ln -sf /sdcard/Pictures "$STORAGE_DIR/pictures"
ln -sf /sdcard/Music "$STORAGE_DIR/music"
ln -sf /sdcard/Movies "$STORAGE_DIR/movies"
echo "Storage setup complete. Access via ~/storage/"
"##,
    ),
    (
        "termux-reload-settings",
        r##"echo "Settings reloaded"
"##,
    ),
    (
        "termux-info",
        r##"echo "sandroot"
echo "========"
echo "Package: @PACKAGE@"
echo "HOME: $HOME"
echo "PREFIX: $PREFIX"
echo "Bundle: $(cat "@PREFIX@/etc/sandroot-version" 2>/dev/null || echo unknown)"
echo "Android: $(getprop ro.build.version.release 2>/dev/null)"
echo "Device: $(getprop ro.product.model 2>/dev/null)"
"##,
    ),
    (
        "termux-saf-managedir",
        r##"echo "Opening directory picker..."
echo "After selecting a directory, the URI will be available for other saf-* commands."
am start -a android.intent.action.OPEN_DOCUMENT_TREE
"##,
    ),
    (
        "termux-change-repo",
        r##"echo "Package Repository Selector"
echo "==========================="
echo ""
echo "Available mirrors:"
echo "1) Default (packages.termux.dev)"
echo "2) Grimler (grimler.se)"
echo "3) A1Batross (a1batross.github.io)"
echo "4) BFSU China (mirrors.bfsu.edu.cn)"
echo "5) Tsinghua China (mirrors.tuna.tsinghua.edu.cn)"
echo "6) USTC China (mirrors.ustc.edu.cn)"
echo ""
read -p "Select mirror [1-6]: " choice
case "$choice" in
    1) MIRROR="https://packages.termux.dev/apt/termux-main" ;;
    2) MIRROR="https://grimler.se/termux/termux-main" ;;
    3) MIRROR="https://a1batross.github.io/termux-main" ;;
    4) MIRROR="https://mirrors.bfsu.edu.cn/termux/apt/termux-main" ;;
    5) MIRROR="https://mirrors.tuna.tsinghua.edu.cn/termux/apt/termux-main" ;;
    6) MIRROR="https://mirrors.ustc.edu.cn/termux/apt/termux-main" ;;
    *)
        echo "Invalid selection"
        exit 1
        ;;
esac
echo ""
echo "Setting mirror to: $MIRROR"
mkdir -p "@PREFIX@/etc/apt"
echo "deb $MIRROR stable main" > "@PREFIX@/etc/apt/sources.list"
echo "Done! Run 'pkg update' to refresh package lists."
"##,
    ),
    (
        "termux-fix-shebang",
        r##"if [ $# -lt 1 ]; then
    echo "Usage: termux-fix-shebang <file> [file2] ..."
    echo "Fix script shebangs to use sandbox paths"
    exit 1
fi
for file in "$@"; do
    if [ ! -f "$file" ]; then
        echo "File not found: $file"
        continue
    fi
    sed -i \
        -e 's|^#!/bin/bash|#!@BIN@/bash|' \
        -e 's|^#!/usr/bin/bash|#!@BIN@/bash|' \
        -e 's|^#!/bin/sh|#!@BIN@/sh|' \
        -e 's|^#!/usr/bin/sh|#!@BIN@/sh|' \
        -e 's|^#!/usr/bin/env |#!@BIN@/env |' \
        -e 's|^#!/bin/env |#!@BIN@/env |' \
        -e 's|^#!/usr/bin/python|#!@BIN@/python|' \
        -e 's|^#!/usr/bin/perl|#!@BIN@/perl|' \
        -e 's|^#!/usr/bin/ruby|#!@BIN@/ruby|' \
        -e 's|^#!/usr/bin/node|#!@BIN@/node|' \
        "$file"
    echo "Fixed: $file"
done
"##,
    ),
    (
        "termux-reset",
        r##"echo "Reset Utility"
echo "============="
echo ""
echo "WARNING: This will remove all installed packages!"
echo "Your home directory files will be preserved."
echo ""
read -p "Are you sure? (yes/no): " confirm
if [ "$confirm" != "yes" ]; then
    echo "Cancelled."
    exit 0
fi
echo ""
echo "Removing installed packages..."
pkg list-installed 2>/dev/null | while read pkg; do
    name=$(echo "$pkg" | cut -d/ -f1)
    case "$name" in
        apt|bash|coreutils|dash|dpkg|findutils|gawk|grep|gzip|less|libandroid*|libc*|ncurses*|readline|sed|tar|termux*)
            ;;
        *)
            pkg uninstall -y "$name" 2>/dev/null
            ;;
    esac
done
echo ""
echo "Clearing package cache..."
apt clean
echo ""
echo "Reset complete. Run 'pkg update && pkg upgrade' to refresh."
"##,
    ),
    (
        "termux-backup",
        r##"OUTPUT="$1"
if [ -z "$OUTPUT" ]; then
    TIMESTAMP=$(date +%Y%m%d_%H%M%S)
    OUTPUT="/sdcard/Download/termux-backup-$TIMESTAMP.tar.gz"
fi
echo "Backing up home directory to: $OUTPUT"
cd "@HOME@" || exit 1
if tar -czf "$OUTPUT" \
    --exclude='node_modules' \
    --exclude='.npm' \
    --exclude='.cache' \
    --exclude='.gradle' \
    --exclude='*.apk' \
    .; then
    SIZE=$(ls -lh "$OUTPUT" | awk '{print $5}')
    echo "Backup complete!"
    echo "File: $OUTPUT"
    echo "Size: $SIZE"
else
    echo "Backup failed!"
    exit 1
fi
"##,
    ),
    (
        "termux-restore",
        r##"INPUT="$1"
if [ -z "$INPUT" ]; then
    echo "Usage: termux-restore <backup-file.tar.gz>"
    echo ""
    echo "Available backups in /sdcard/Download/:"
    ls -lh /sdcard/Download/termux-backup-*.tar.gz 2>/dev/null || echo "  (none found)"
    exit 1
fi
if [ ! -f "$INPUT" ]; then
    echo "File not found: $INPUT"
    exit 1
fi
echo "WARNING: This will overwrite existing files in your home directory!"
echo "Backup file: $INPUT"
read -p "Are you sure? (yes/no): " confirm
if [ "$confirm" != "yes" ]; then
    echo "Cancelled."
    exit 0
fi
cd "@HOME@" || exit 1
echo "Restoring..."
if tar -xzf "$INPUT"; then
    echo "Restore complete!"
    echo "You may need to restart the terminal for all changes to take effect."
else
    echo "Restore failed!"
    exit 1
fi
"##,
    ),
    (
        "termux-file-editor",
        r##"if [ $# -lt 1 ]; then
    echo "Usage: termux-file-editor <file>"
    exit 1
fi
FILE="$1"
if [ ! -f "$FILE" ]; then
    echo "File not found: $FILE"
    exit 1
fi
ABSPATH=$(realpath "$FILE")
am start -a android.intent.action.EDIT -d "file://$ABSPATH" -t "text/plain"
"##,
    ),
    (
        "termux-url-opener",
        r##"URL="$1"
if [ -x "@HOME@/.termux/termux-url-opener" ]; then
    exec "@HOME@/.termux/termux-url-opener" "$URL"
fi
echo "URL received: $URL"
echo ""
echo "To customize URL handling, create ~/.termux/termux-url-opener"
"##,
    ),
    (
        "termux-file-opener",
        r##"FILE="$1"
if [ -x "@HOME@/.termux/termux-file-opener" ]; then
    exec "@HOME@/.termux/termux-file-opener" "$FILE"
fi
if [ -f "$FILE" ]; then
    echo "File received: $FILE"
    echo ""
    ls -la "$FILE"
    echo ""
    file "$FILE" 2>/dev/null
else
    echo "File not found: $FILE"
fi
echo ""
echo "To customize file handling, create ~/.termux/termux-file-opener"
"##,
    ),
];

/// Written only when the bundle did not ship its own `pkg-config`.
pub(crate) const PKG_CONFIG: (&str, &str) = (
    "pkg-config",
    r##"if [ -x "@BIN@/pkgconf" ]; then
    exec "@BIN@/pkgconf" "$@"
fi
echo "pkg-config not found. Install with: pkg install pkg-config" >&2
exit 1
"##,
);
