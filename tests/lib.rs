
/// Routes the engine's `log` output through the test harness. Set
/// `RUST_LOG=stackre_nfa=trace` to see it.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
