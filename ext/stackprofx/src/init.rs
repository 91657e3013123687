/// One-time process setup, run whenever a [`Profiler`](crate::Profiler) is created.
///
/// With the `debug` feature, installs env_logger so `RUST_LOG=stackprofx=trace` shows
/// scheduler and session activity. Calling it more than once is harmless.
pub fn init() {
    #[cfg(feature = "debug")]
    {
        let _ = env_logger::builder()
            .format_timestamp(None)
            .format_module_path(false)
            .try_init();
    }
}
