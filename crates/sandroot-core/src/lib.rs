#![deny(clippy::all)]

mod core;

pub mod archive {
    pub use crate::core::archive::*;
}

pub mod commands {
    pub use crate::core::commands::*;
}

pub mod identity {
    pub use crate::core::identity::*;
}

pub mod permissions {
    pub use crate::core::permissions::*;
}

pub use crate::core::cancel::CancelToken;
pub use crate::core::config::{
    BootstrapConfig, BundleConfig, ConfigOverrides, DispatchSettings, ExtractSettings,
    GlobalOptions, SandboxConfig, TransferSettings, DEFAULT_BUNDLE_URL, DEFAULT_BUNDLE_VERSION,
    DEFAULT_PACKAGE_NAME,
};
pub use crate::core::errors::{
    BootstrapError, ExtractError, PermissionError, TransferError,
};
pub use crate::core::heal::{sentinel_state, HealReport, SentinelState};
pub use crate::core::install::{
    BundleSource, FetchedBundle, HttpBundleSource, InstallHandle, InstallOutcome, InstallStatus,
    Installer, KeepAwake, LocalBundleSource, NoKeepAwake, NullSink, ProgressEvent, ProgressSink,
    Stage, FAILURE_PERCENT,
};
pub use crate::core::layout::{LayoutError, SandboxLayout};
pub use crate::core::state::{InstalledVersion, VersionMarker};
pub use crate::core::transfer::{TransferClient, TransferProgress};
