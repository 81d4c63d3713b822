//! New-channel catch-up delivered against a live local endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use drivewatch_core::drive::{DiscoveredDrive, DriveType};
use drivewatch_core::smart::SmartReading;
use drivewatch_db::repositories::{ChannelRepo, DriveRepo, SmartCacheRepo};
use drivewatch_db::DbPool;
use drivewatch_notify::Dispatcher;

/// Minimal HTTP endpoint: answers every request with 200 and counts hits.
async fn spawn_endpoint() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                // Read the request head, then the content-length'd body.
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                let (mut header_end, mut content_length) = (None, 0usize);
                loop {
                    let Ok(n) = socket.read(&mut chunk).await else {
                        return;
                    };
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if header_end.is_none() {
                        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                            header_end = Some(pos + 4);
                            let head = String::from_utf8_lossy(&buf[..pos]);
                            content_length = head
                                .lines()
                                .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(str::to_string))
                                .and_then(|v| v.trim().parse().ok())
                                .unwrap_or(0);
                        }
                    }
                    if let Some(end) = header_end {
                        if buf.len() >= end + content_length {
                            break;
                        }
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}/hook"), hits)
}

async fn setup() -> DbPool {
    let pool = drivewatch_db::memory_pool().await.expect("pool");
    drivewatch_db::run_migrations(&pool).await.expect("migrations");
    pool
}

async fn insert_drive(pool: &DbPool, serial: &str) -> i64 {
    DriveRepo::insert_discovered(
        pool,
        &DiscoveredDrive {
            serial_number: serial.to_string(),
            device_path: "/dev/sda".to_string(),
            vendor: "Acme".to_string(),
            model: "Blazer 1TB".to_string(),
            firmware_revision: "1.0".to_string(),
            capacity: 1_000_204_886_016,
            drive_type: DriveType::Ssd,
            rpm: None,
            interface_type: None,
            logical_sector_size: None,
            physical_sector_size: None,
        },
        Utc::now(),
    )
    .await
    .expect("insert drive")
    .drive_id
}

fn reading(temperature: f64, health_passed: bool) -> SmartReading {
    SmartReading {
        timestamp: Utc::now(),
        temperature: Some(temperature),
        power_on_hours: Some(100),
        power_cycle_count: Some(10),
        reallocated_sectors: Some(0),
        pending_sectors: Some(0),
        uncorrectable_errors: Some(0),
        health_passed: Some(health_passed),
        attributes: Vec::new(),
    }
}

#[tokio::test]
async fn fresh_channel_catches_up_on_existing_bad_state() {
    let pool = setup().await;
    let (url, hits) = spawn_endpoint().await;

    // The drive is already hot and failing before the channel exists.
    let drive_id = insert_drive(&pool, "S1").await;
    SmartCacheRepo::upsert(&pool, drive_id, &reading(70.0, false))
        .await
        .expect("cache");

    let channel = ChannelRepo::create(
        &pool,
        "ops hooks",
        "webhook",
        &format!(r#"{{"url":"{url}","auth":{{"type":"none"}}}}"#),
        Utc::now(),
    )
    .await
    .expect("channel");
    ChannelRepo::subscribe(&pool, channel.id, "temperature").await.expect("sub");
    ChannelRepo::subscribe(&pool, channel.id, "smart_error").await.expect("sub");

    let dispatcher = Dispatcher::new(pool, 55.0);
    // No new poll happens; the cached state alone triggers both alerts.
    let delivered = dispatcher.catch_up_channel(channel.id).await.expect("catch up");
    assert_eq!(delivered, 2);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn catch_up_respects_the_subscription_filter() {
    let pool = setup().await;
    let (url, hits) = spawn_endpoint().await;

    let drive_id = insert_drive(&pool, "S1").await;
    SmartCacheRepo::upsert(&pool, drive_id, &reading(70.0, false))
        .await
        .expect("cache");

    // Only temperature is subscribed; the health failure stays undelivered.
    let channel = ChannelRepo::create(
        &pool,
        "ops hooks",
        "webhook",
        &format!(r#"{{"url":"{url}"}}"#),
        Utc::now(),
    )
    .await
    .expect("channel");
    ChannelRepo::subscribe(&pool, channel.id, "temperature").await.expect("sub");

    let dispatcher = Dispatcher::new(pool, 55.0);
    let delivered = dispatcher.catch_up_channel(channel.id).await.expect("catch up");
    assert_eq!(delivered, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fire_reaches_the_endpoint() {
    let pool = setup().await;
    let (url, hits) = spawn_endpoint().await;

    let channel = ChannelRepo::create(
        &pool,
        "ops hooks",
        "webhook",
        &format!(r#"{{"url":"{url}","auth":{{"type":"bearer","token":"secret"}}}}"#),
        Utc::now(),
    )
    .await
    .expect("channel");

    let dispatcher = Dispatcher::new(pool, 55.0);
    dispatcher.test_channel(channel.id).await.expect("test fire");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
