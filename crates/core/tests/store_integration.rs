//! RedisStore 왕복 통합 테스트
//!
//! 로컬 `TcpListener` 위의 최소 RESP 응답기를 대상으로
//! 연결 핸드셰이크(AUTH/SELECT)와 `LPOP` 응답 매핑을 검증합니다.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hookprobe_core::config::StoreConfig;
use hookprobe_core::store::{RedisStore, SideEffectStore};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

// =============================================================================
// 테스트용 RESP 응답기
// =============================================================================

type Lists = Arc<Mutex<HashMap<String, VecDeque<String>>>>;
type Commands = Arc<Mutex<Vec<Vec<String>>>>;

struct RespServer {
    port: u16,
    lists: Lists,
    commands: Commands,
}

impl RespServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let lists: Lists = Arc::default();
        let commands: Commands = Arc::default();

        let (l, c) = (Arc::clone(&lists), Arc::clone(&commands));
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let (lists, commands) = (Arc::clone(&l), Arc::clone(&c));
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);
                    while let Some(command) = read_command(&mut reader).await {
                        let reply = reply_to(&command, &lists);
                        commands.lock().unwrap().push(command);
                        if write.write_all(reply.as_bytes()).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });

        Self {
            port,
            lists,
            commands,
        }
    }

    fn push(&self, key: &str, record: &str) {
        self.lists
            .lock()
            .unwrap()
            .entry(key.to_owned())
            .or_default()
            .push_back(record.to_owned());
    }

    fn commands_named(&self, name: &str) -> Vec<Vec<String>> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.first().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .cloned()
            .collect()
    }

    fn config(&self) -> StoreConfig {
        StoreConfig {
            host: "127.0.0.1".to_owned(),
            port: self.port,
            connect_timeout: Duration::from_secs(2),
            ..StoreConfig::default()
        }
    }
}

/// `*N` 배열의 bulk string 인자를 읽습니다. 연결이 끊기면 `None`.
async fn read_command<R>(reader: &mut BufReader<R>) -> Option<Vec<String>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await.ok()? == 0 {
        return None;
    }
    let count: usize = line.trim_end().strip_prefix('*')?.parse().ok()?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await.ok()?;
        let len: usize = line.trim_end().strip_prefix('$')?.parse().ok()?;
        let mut buf = vec![0u8; len + 2];
        reader.read_exact(&mut buf).await.ok()?;
        buf.truncate(len);
        args.push(String::from_utf8(buf).ok()?);
    }
    Some(args)
}

fn reply_to(command: &[String], lists: &Lists) -> String {
    let name = command.first().map(|n| n.to_ascii_uppercase()).unwrap_or_default();
    match name.as_str() {
        "LPOP" => {
            let popped = command
                .get(1)
                .and_then(|key| lists.lock().unwrap().get_mut(key)?.pop_front());
            match popped {
                Some(v) => format!("${}\r\n{v}\r\n", v.len()),
                None => "$-1\r\n".to_owned(),
            }
        }
        "PING" => "+PONG\r\n".to_owned(),
        // AUTH, SELECT, CLIENT SETINFO 등
        _ => "+OK\r\n".to_owned(),
    }
}

// =============================================================================
// 테스트
// =============================================================================

#[tokio::test]
async fn queued_record_is_popped_exactly_once() {
    let server = RespServer::start().await;
    server.push("integration:basic-usage", r#"{"msg":"hello"}"#);

    let store = RedisStore::connect(&server.config()).await.unwrap();

    let first = store.pop("integration:basic-usage").await.unwrap();
    assert_eq!(first.as_deref(), Some(r#"{"msg":"hello"}"#));

    let second = store.pop("integration:basic-usage").await.unwrap();
    assert_eq!(second, None, "record must not be seen twice");
}

#[tokio::test]
async fn nil_reply_for_absent_key_maps_to_none() {
    let server = RespServer::start().await;
    let store = RedisStore::connect(&server.config()).await.unwrap();

    assert_eq!(store.pop("integration:nothing-here").await.unwrap(), None);

    let pops = server.commands_named("LPOP");
    assert_eq!(pops.len(), 1);
    assert_eq!(pops[0], ["LPOP", "integration:nothing-here"]);
}

#[tokio::test]
async fn records_come_out_in_push_order() {
    let server = RespServer::start().await;
    server.push("integration:twice", "1");
    server.push("integration:twice", "2");

    let store = RedisStore::connect(&server.config()).await.unwrap();

    assert_eq!(store.pop("integration:twice").await.unwrap().as_deref(), Some("1"));
    assert_eq!(store.pop("integration:twice").await.unwrap().as_deref(), Some("2"));
    assert_eq!(store.pop("integration:twice").await.unwrap(), None);
}

#[tokio::test]
async fn connect_authenticates_and_selects_database() {
    let server = RespServer::start().await;
    let config = StoreConfig {
        username: "hook".to_owned(),
        password: "s3cret".to_owned(),
        database: 3,
        ..server.config()
    };

    let store = RedisStore::connect(&config).await.unwrap();
    // 핸드셰이크가 끝난 뒤의 명령도 같은 연결로 처리되는지 확인
    assert_eq!(store.pop("integration:x").await.unwrap(), None);

    let auth = server.commands_named("AUTH");
    assert_eq!(auth.len(), 1);
    assert_eq!(auth[0][1..], ["hook", "s3cret"]);

    let select = server.commands_named("SELECT");
    assert_eq!(select.len(), 1);
    assert_eq!(select[0][1], "3");
}

#[tokio::test]
async fn default_config_skips_auth_and_select() {
    let server = RespServer::start().await;

    let store = RedisStore::connect(&server.config()).await.unwrap();
    assert_eq!(store.pop("integration:x").await.unwrap(), None);

    assert!(server.commands_named("AUTH").is_empty());
    assert!(server.commands_named("SELECT").is_empty());
}
