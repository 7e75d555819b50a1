// Utils compartidos

pub mod debounce;
pub mod device;
pub mod format;
pub mod i18n;
pub mod qr_ffi;
pub mod storage;
pub mod wecom_ffi;
