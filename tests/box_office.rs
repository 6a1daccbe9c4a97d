//! Drives the line-JSON front end over a loopback socket.

use futures::{SinkExt, StreamExt};
use seatd::{
    audit::FileAuditLog,
    catalog::Catalog,
    evaluator::Evaluator,
    handle_client::{serve, BoxOffice},
    ledger::Ledger,
};
use serde_json::{json, Value};
use std::{path::Path, sync::Arc, time::Duration};
use tokio::net::{tcp, TcpListener, TcpStream};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

struct Client {
    reader: FramedRead<tcp::OwnedReadHalf, LinesCodec>,
    writer: FramedWrite<tcp::OwnedWriteHalf, LinesCodec>,
}

impl Client {
    async fn connect(address: std::net::SocketAddr) -> Self {
        let (reader, writer) = TcpStream::connect(address).await.unwrap().into_split();
        Self {
            reader: FramedRead::new(reader, LinesCodec::new()),
            writer: FramedWrite::new(writer, LinesCodec::new()),
        }
    }

    async fn send(&mut self, action: &str, value: Value) {
        let line = json!({ "action": action, "value": value }).to_string();
        self.writer.send(line).await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(5), self.reader.next())
            .await
            .expect("server answered in time")
            .expect("connection still open")
            .unwrap();
        serde_json::from_str(&line).unwrap()
    }

    async fn call(&mut self, action: &str, value: Value) -> Value {
        self.send(action, value).await;
        self.recv().await
    }
}

async fn start_office(audit_log: &Path) -> (std::net::SocketAddr, Arc<BoxOffice>) {
    let evaluator = Evaluator::new(
        Arc::new(Ledger::new()),
        Arc::new(FileAuditLog::new(audit_log)),
    );
    let office = Arc::new(BoxOffice::new(Catalog::default(), evaluator));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, Arc::clone(&office)));
    (address, office)
}

async fn start(audit_log: &Path) -> std::net::SocketAddr {
    start_office(audit_log).await.0
}

/// Waits until the ledger has exactly `expected` subscribers.
async fn wait_for_subscribers(office: &BoxOffice, expected: usize) {
    let ledger = office.evaluator().ledger();
    for _ in 0..100 {
        if ledger.subscriber_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "expected {expected} subscribers, found {}",
        ledger.subscriber_count()
    );
}

fn book(movie: &str, showtime: &str, seats: &[&str]) -> Value {
    json!({ "movie": movie, "showtime": showtime, "seats": seats })
}

#[tokio::test]
async fn booking_conflict_display_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("bookings.txt");
    let mut client = Client::connect(start(&log).await).await;

    let answer = client
        .call("Book", book("Bollywood Movie 1", "10:00 AM", &["A1", "A2"]))
        .await;
    assert_eq!(answer["action"], "Booked");
    assert_eq!(answer["value"]["message"], "Booking successful!");

    let answer = client
        .call("Book", book("Bollywood Movie 1", "10:00 AM", &["A2", "A3"]))
        .await;
    assert_eq!(answer["action"], "Conflict");
    assert_eq!(answer["value"]["seats"], json!(["A2"]));
    assert_eq!(
        answer["value"]["message"],
        "Seat A2 is already booked for this showtime."
    );

    let answer = client
        .call(
            "Seats",
            json!({ "movie": "Bollywood Movie 1", "showtime": "10:00 AM" }),
        )
        .await;
    assert_eq!(answer["value"], json!(["A1", "A2"]));

    let answer = client
        .call("Book", book("Hollywood Movie 2", "1:00 PM", &["A1"]))
        .await;
    assert_eq!(answer["action"], "Booked");

    let answer = client.call("Display", Value::Null).await;
    assert_eq!(
        answer["value"],
        json!([
            "Bollywood Movie 1 - 10:00 AM: [A1, A2]",
            "Hollywood Movie 2 - 1:00 PM: [A1]"
        ])
    );

    let answer = client.call("Status", Value::Null).await;
    assert_eq!(answer["value"], 3);

    let answer = client.call("Clear", Value::Null).await;
    assert_eq!(answer["action"], "Cleared");
    let answer = client.call("Display", Value::Null).await;
    assert_eq!(answer["value"], json!([]));

    let written = std::fs::read_to_string(&log).unwrap();
    assert_eq!(written.matches("-------------------------").count(), 2);
    assert!(written.starts_with("Movie: Bollywood Movie 1\nShowtime: 10:00 AM\nSeats: [A1, A2]\n"));
}

#[tokio::test]
async fn refusals_leave_the_ledger_alone() {
    let dir = tempfile::tempdir().unwrap();
    let mut client = Client::connect(start(&dir.path().join("bookings.txt")).await).await;

    let answer = client
        .call("Book", book("Bollywood Movie 1", "10:00 AM", &[]))
        .await;
    assert_eq!(answer["action"], "Refused");
    assert_eq!(answer["value"]["message"], "Please select at least one seat.");

    let answer = client
        .call("Book", book("Bollywood Movie 1", "10:00 AM", &["A1", "Z9"]))
        .await;
    assert_eq!(answer["action"], "Refused");
    assert_eq!(answer["value"]["seats"], json!(["Z9"]));

    let answer = client
        .call("Book", book("Unlisted", "10:00 AM", &["A1"]))
        .await;
    assert_eq!(answer["action"], "Refused");

    let answer = client.call("Status", Value::Null).await;
    assert_eq!(answer["value"], 0);
}

#[tokio::test]
async fn recommendation_follows_global_occupancy() {
    let dir = tempfile::tempdir().unwrap();
    let mut client = Client::connect(start(&dir.path().join("bookings.txt")).await).await;

    let answer = client.call("Recommend", Value::Null).await;
    assert_eq!(answer["action"], "Recommended");
    assert_eq!(answer["value"]["message"], "Recommended Seat: A1");
    assert!(answer["value"]["note"].is_string());

    client
        .call("Book", book("Hollywood Movie 3", "7:00 PM", &["A1"]))
        .await;
    let answer = client.call("Recommend", Value::Null).await;
    assert_eq!(answer["value"]["seats"], json!(["A2"]));

    let every_seat = ["A1", "A2", "A3", "A4", "A5", "B1", "B2", "B3", "B4", "B5"];
    client
        .call("Book", book("Bollywood Movie 2", "4:00 PM", &every_seat))
        .await;
    let answer = client.call("Recommend", Value::Null).await;
    assert_eq!(answer["action"], "NoneAvailable");
    assert_eq!(
        answer["value"]["message"],
        "No seats available for recommendation!"
    );
}

#[tokio::test]
async fn listeners_receive_updates() {
    let dir = tempfile::tempdir().unwrap();
    let (address, office) = start_office(&dir.path().join("bookings.txt")).await;

    let mut listener = Client::connect(address).await;
    listener.send("Listen", Value::Null).await;
    wait_for_subscribers(&office, 1).await;

    let mut booker = Client::connect(address).await;
    booker
        .call("Book", book("Hollywood Movie 1", "1:00 PM", &["B2"]))
        .await;

    let update = listener.recv().await;
    assert_eq!(update["action"], "LedgerUpdate");
    assert_eq!(update["value"]["Committed"]["seats"], json!(["B2"]));
    assert_eq!(
        update["value"]["Committed"]["key"]["showtime"],
        "1:00 PM"
    );
}

#[tokio::test]
async fn disconnected_listener_is_released() {
    let dir = tempfile::tempdir().unwrap();
    let (address, office) = start_office(&dir.path().join("bookings.txt")).await;

    let mut listener = Client::connect(address).await;
    listener.send("Listen", Value::Null).await;
    wait_for_subscribers(&office, 1).await;

    drop(listener);
    wait_for_subscribers(&office, 0).await;

    let mut client = Client::connect(address).await;
    assert_eq!(client.call("Ping", Value::Null).await["action"], "Pong");
}

#[tokio::test]
async fn malformed_line_closes_only_that_connection() {
    let dir = tempfile::tempdir().unwrap();
    let address = start(&dir.path().join("bookings.txt")).await;

    let mut broken = Client::connect(address).await;
    broken.writer.send("{ not json".to_owned()).await.unwrap();
    let next = tokio::time::timeout(Duration::from_secs(5), broken.reader.next())
        .await
        .unwrap();
    assert!(!matches!(next, Some(Ok(_))));

    let mut client = Client::connect(address).await;
    assert_eq!(client.call("Ping", Value::Null).await["action"], "Pong");
}
