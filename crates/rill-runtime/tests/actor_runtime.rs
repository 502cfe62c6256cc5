//! End-to-end tests of the actor runtime: competing consumers, failure
//! isolation, and request/reply over real topics.

use futures::FutureExt;
use futures::StreamExt;
use parking_lot::Mutex;
use rill_runtime::{
    ActorBody, App, FnSink, RuntimeError, Service, Source, TopicValue,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

#[tokio::test]
async fn test_competing_consumers_deliver_each_message_once() {
    let app = App::new("integration");
    let seen = Arc::new(Mutex::new(Vec::new()));

    let actor = {
        let seen = Arc::clone(&seen);
        app.actor::<String>("counter")
            .topic("numbers")
            .concurrency(3)
            .sink(Arc::new(FnSink::new(move |v: &String| {
                seen.lock().push(v.clone());
                Ok(())
            })))
            .handler(|source| ActorBody::Sequence(source.values()))
    };

    let mut service = actor.service();
    service.start().await.unwrap();
    assert_eq!(service.instances().len(), 3);

    let producer = app.topic::<String>("numbers");
    for i in 1..=6 {
        producer
            .send_value(None, format!("m{i}"), None)
            .await
            .unwrap();
    }

    sleep(Duration::from_millis(100)).await;
    service.stop().await;

    let seen = seen.lock();
    assert_eq!(seen.len(), 6, "each message consumed exactly once");
    let unique: HashSet<_> = seen.iter().cloned().collect();
    assert_eq!(unique.len(), 6);
    for i in 1..=6 {
        assert!(unique.contains(&format!("m{i}")));
    }
}

#[tokio::test]
async fn test_replicas_share_one_source() {
    let app = App::new("integration");
    let actor = app
        .actor::<String>("workers")
        .concurrency(5)
        .handler(|source| ActorBody::Sequence(source.values()));

    let mut service = actor.service();
    service.start().await.unwrap();

    let first = service.instances()[0].stream().clone();
    for instance in service.instances() {
        assert!(Source::same_source(&first, instance.stream()));
    }

    service.stop().await;
}

#[tokio::test]
async fn test_failed_replica_leaves_siblings_running() {
    let app = App::new("integration");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hook_calls = Arc::new(Mutex::new(0u32));

    let actor = {
        let seen = Arc::clone(&seen);
        let hook_calls = Arc::clone(&hook_calls);
        app.actor::<String>("fragile")
            .topic("jobs")
            .concurrency(2)
            .sink(Arc::new(FnSink::new(move |v: &String| {
                seen.lock().push(v.clone());
                Ok(())
            })))
            .on_error(move |_actor, _err| {
                let hook_calls = Arc::clone(&hook_calls);
                async move {
                    *hook_calls.lock() += 1;
                }
                .boxed()
            })
            .handler(|source| {
                ActorBody::Sequence(
                    source
                        .values()
                        .map(|item| {
                            item.and_then(|v| {
                                if v == "poison" {
                                    Err(RuntimeError::handler(anyhow::anyhow!(
                                        "poison value"
                                    )))
                                } else {
                                    Ok(v)
                                }
                            })
                        })
                        .boxed(),
                )
            })
    };

    let mut service = actor.service();
    service.start().await.unwrap();

    let producer = app.topic::<String>("jobs");
    producer
        .send_value(None, "poison".to_string(), None)
        .await
        .unwrap();
    sleep(Duration::from_millis(100)).await;

    // Exactly one replica failed, and the hook saw it exactly once
    assert_eq!(*hook_calls.lock(), 1);

    // The surviving replica keeps consuming
    producer
        .send_value(None, "after1".to_string(), None)
        .await
        .unwrap();
    producer
        .send_value(None, "after2".to_string(), None)
        .await
        .unwrap();
    sleep(Duration::from_millis(100)).await;

    {
        let seen = seen.lock();
        assert!(seen.contains(&"after1".to_string()));
        assert!(seen.contains(&"after2".to_string()));
    }

    service.stop().await;
    assert_eq!(*hook_calls.lock(), 1, "stop must not re-report the failure");
}

#[tokio::test]
async fn test_stop_cancels_blocked_replicas() {
    let app = App::new("integration");
    let actor = app
        .actor::<String>("idle")
        .concurrency(3)
        .handler(|source| ActorBody::Sequence(source.values()));

    let mut service = actor.service();
    service.start().await.unwrap();

    // Nothing was ever published; every replica is parked on the pull.
    // Stop must still return promptly via cancellation.
    timeout(Duration::from_secs(1), service.stop())
        .await
        .expect("stop must not hang on blocked replicas");
    assert!(service.state().is_stopped());
}

#[tokio::test]
async fn test_request_reply_roundtrip() {
    let app = App::new("integration");

    let requests = app.topic::<String>("requests");
    let server_stream = requests.open_stream();
    let replies = app.topic::<String>("replies").open_stream();

    let responder = app
        .actor::<String>("responder")
        .topic("requests")
        .handler(|source| ActorBody::Sequence(source.values()));
    {
        let responder = responder.clone();
        tokio::spawn(async move {
            while let Some(Ok(event)) = server_stream.next().await {
                if let TopicValue::Request(req) = event.value {
                    let answer = format!("pong:{}", req.value);
                    responder.reply(None, answer, &req).await.unwrap();
                }
            }
        });
    }

    let client = app
        .actor::<String>("client")
        .topic("requests")
        .handler(|source| ActorBody::Sequence(source.values()));

    let promise = client
        .ask(
            None,
            "ping".to_string(),
            None,
            Some("replies".into()),
            None,
        )
        .await
        .unwrap();

    let event = timeout(Duration::from_secs(1), replies.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match event.value {
        TopicValue::Response(resp) => {
            assert_eq!(resp.correlation_id, promise.correlation_id());
            assert_eq!(resp.value, "pong:ping");
        }
        other => panic!("expected response envelope, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sequence_order_within_one_replica() {
    let app = App::new("integration");
    let seen = Arc::new(Mutex::new(Vec::new()));

    let actor = {
        let seen = Arc::clone(&seen);
        app.actor::<String>("ordered")
            .topic("events")
            .sink(Arc::new(FnSink::new(move |v: &String| {
                seen.lock().push(v.clone());
                Ok(())
            })))
            .handler(|source| ActorBody::Sequence(source.values()))
    };

    let mut service = actor.service();
    service.start().await.unwrap();

    let producer = app.topic::<String>("events");
    for i in 1..=4 {
        producer
            .send_value(None, format!("e{i}"), None)
            .await
            .unwrap();
    }

    sleep(Duration::from_millis(100)).await;
    service.stop().await;

    // One replica: sink order is pull order is publish order
    assert_eq!(*seen.lock(), vec!["e1", "e2", "e3", "e4"]);
}
