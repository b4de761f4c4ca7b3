//! Request context example
//!
//! Labels, trace ids and baggage travel on the context and end up in every
//! entry logged for the request.
//!
//! Run with: cargo run --example request_context

use gcloud_log_handler::prelude::*;
use gcloud_log_handler::info;

fn handle_request(logger: &Logger, ctx: &Context, user: &str) {
    let ctx = ctx.with_labels([("user", user)]);
    logger.log(&ctx, Level::INFO, "loading profile", []);
    info!(logger, ctx: &ctx, "profile for {} loaded", user);
}

fn main() -> Result<()> {
    println!("=== gcloud-log-handler - Request Context Example ===\n");

    let handler = CloudHandler::builder(JsonWriterSink::stdout())
        .otel_tracing_for_project("my-project")
        .otel_baggage()
        .podinfo_labels("/etc/podinfo")
        .build();
    let logger = Logger::new(handler).with_group("request");

    let span = SpanContext::from_hex("4bf92f3577b34da6a3ce929d0e0e4736", "00f067aa0ba902b7", true)?;
    let baggage: Baggage = [
        Member::new("tenant", "acme"),
        Member::new("plan", "pro").with_property(Property::new("since", "2024")),
    ]
    .into_iter()
    .collect();

    let ctx = Context::background()
        .with_labels([("request_id", "r-42")])
        .with_span(span)
        .with_baggage(baggage);

    handle_request(&logger, &ctx, "jane");

    logger.flush()?;
    println!("\n=== Example completed successfully! ===");
    Ok(())
}
