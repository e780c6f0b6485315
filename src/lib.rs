pub mod core {
    pub mod capture;
    pub mod classifier;
    pub mod error;
    pub mod extract;
    pub mod history;
    pub mod models;
    pub mod parser;
    pub mod report;
    pub mod shutdown;
    pub mod sniffer;
}

/// Names of the capture devices visible to libpcap.
pub fn devices() -> Vec<String> {
    core::capture::list_devices()
}
