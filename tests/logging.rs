use fiscal_metrics::logging;

#[test]
fn logging_initialization_is_idempotent() {
    logging::init_logging().expect("first initialization succeeds");
    logging::init_logging().expect("subsequent initialization succeeds");
}

#[test]
fn log_event_works_before_and_after_initialization() {
    logging::log_event(
        file!(),
        "LoggingTest",
        "log_event",
        "test.logging",
        line!(),
        "before init",
        None,
    );
    logging::init_logging().expect("initialization succeeds");
    logging::log_event(
        file!(),
        "LoggingTest",
        "log_event",
        "test.logging",
        line!(),
        "after init",
        Some("synthetic failure"),
    );
}
