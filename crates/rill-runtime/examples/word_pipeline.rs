/// Actor pipeline example: three competing replicas counting words.
///
/// Demonstrates the core pieces end to end:
/// - a typed topic with a structured Record value
/// - an actor with concurrency > 1 pulling from one shared source
/// - sink fan-out and an ask/reply envelope on the wire
///
/// Run with: cargo run --example word_pipeline
use rill_protocol::impl_record;
use rill_runtime::{ActorBody, App, FnSink, Service, TopicValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Phrase {
    text: String,
}

impl_record!(Phrase, "demo.Phrase");

#[tokio::main]
async fn main() -> rill_runtime::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Rill: Word Pipeline Example ===\n");

    let app = App::new("word-pipeline");

    // Three replicas compete for phrases from one shared source; each
    // processed phrase goes through the sink
    let counter = app
        .actor::<Phrase>("word-counter")
        .topic("phrases")
        .concurrency(3)
        .sink(Arc::new(FnSink::new(|phrase: &Phrase| {
            let words = phrase.text.split_whitespace().count();
            println!("[sink] {:?} -> {} words", phrase.text, words);
            Ok(())
        })))
        .handler(|source| ActorBody::Sequence(source.values()));

    let mut service = counter.service();
    service.start().await?;
    println!("Started {} replicas\n", service.instances().len());

    let producer = app.topic::<Phrase>("phrases");
    for text in [
        "the quick brown fox",
        "jumps over",
        "the lazy dog",
        "streams all the way down",
    ] {
        producer
            .send_value(
                None,
                Phrase {
                    text: text.to_string(),
                },
                None,
            )
            .await?;
    }

    sleep(Duration::from_millis(200)).await;

    // Request/reply: the envelope carries a correlation id to the wire
    let replies = app.topic::<Phrase>("replies").open_stream();
    let promise = counter
        .ask(
            None,
            Phrase {
                text: "how many words so far?".to_string(),
            },
            None,
            Some("replies".to_string()),
            None,
        )
        .await?;
    println!("\nSent request, correlation id: {}", promise.correlation_id());

    counter
        .reply(
            None,
            Phrase {
                text: "fourteen".to_string(),
            },
            promise.request(),
        )
        .await?;

    if let Some(Ok(event)) = replies.next().await {
        if let TopicValue::Response(resp) = event.value {
            println!(
                "Got reply {:?} for correlation id {}",
                resp.value.text, resp.correlation_id
            );
        }
    }

    service.stop().await;
    println!("\n=== Example Complete ===");
    Ok(())
}
