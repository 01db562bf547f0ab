use futures::{Future, FutureExt};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn setup_tracing() {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    let fmt_layer = fmt::layer()
        .with_line_number(true)
        .compact()
        .with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

pub async fn run_with_tracing<F, Fut>(future: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
{
    setup_tracing();

    match std::panic::AssertUnwindSafe(future()).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = ?e, "Application exited with error"),
        Err(e) => capture_panic_details(e),
    }
}

fn capture_panic_details(e: Box<dyn std::any::Any + Send>) {
    let backtrace = backtrace::Backtrace::new();
    if let Some(s) = e.downcast_ref::<&str>() {
        error!(panic_message = *s, backtrace = ?backtrace, "Panic occurred with message");
    } else if let Some(s) = e.downcast_ref::<String>() {
        error!(panic_message = s, backtrace = ?backtrace, "Panic occurred with message");
    } else {
        error!(backtrace = ?backtrace, "Panic occurred but the payload is not a string");
    }
}
