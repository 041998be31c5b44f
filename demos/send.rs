use courier::transport::Scripted;
use courier::{ContentKind, Courier, Message, Transport};
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    // A flaky channel: the first two attempts fail, the third goes through.
    let backend: Scripted<Message> = Scripted::fail_times(2);
    let mut courier = Courier::new(Transport::new(backend.clone()));

    match courier.send("a@b.com", ContentKind::OrderReceived).await {
        Ok(receipt) => println!(
            "delivered {} after {} attempt(s)",
            receipt.message_id, receipt.attempts
        ),
        Err(err) => eprintln!("{err}"),
    }

    // Exhaustion surfaces as a typed error instead of a silent false.
    let dead: Scripted<Message> = Scripted::always_fail();
    let mut courier = Courier::new(Transport::new(dead));
    if let Err(err) = courier.send("a@b.com", ContentKind::OrderShipped).await {
        eprintln!("{err}");
    }
}
