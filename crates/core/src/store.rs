//! 부수 효과 스토어 접근
//!
//! 수신기는 요청마다 직렬화된 레코드 하나를 Redis 리스트
//! `integration:<scenario>`에 넣고, 검증기는 블로킹 없는 `LPOP`으로 꺼냅니다.
//! [`SideEffectStore`]가 경계 trait이고, [`RedisStore`]는 멀티플렉스 연결 하나를
//! 쓰는 실제 구현입니다.

use std::future::Future;
use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::StoreError;

/// 큐에 쌓인 부수 효과 레코드를 한 번만 읽고 제거합니다.
pub trait SideEffectStore: Send + Sync + 'static {
    /// `key` 아래 가장 오래된 레코드를 제거하고 반환합니다.
    /// 리스트가 비었거나 없으면 `None`이며, 레코드를 기다리며 블로킹하지 않습니다.
    fn pop(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;
}

/// Redis 기반 스토어
///
/// 멀티플렉스 연결이므로 복제본이 소켓 하나를 공유하고,
/// `RedisStore` 하나가 실행 중 모든 검증을 처리합니다.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    command_timeout: Duration,
}

impl RedisStore {
    /// 연결하고 인증합니다 (`AUTH` / `SELECT`는 핸드셰이크 중에 수행).
    ///
    /// # Errors
    ///
    /// 서버에 닿지 못하거나, 인증이 거부되거나, `connect_timeout` 안에 응답이
    /// 없으면 `StoreError::Connection`을 반환합니다.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let info = redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: redis::RedisConnectionInfo {
                db: config.database,
                username: non_empty(&config.username),
                password: non_empty(&config.password),
                ..Default::default()
            },
        };
        let client =
            redis::Client::open(info).map_err(|e| StoreError::Connection(e.to_string()))?;

        debug!(host = %config.host, port = config.port, db = config.database, "connecting to redis");

        let conn = tokio::time::timeout(
            config.connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            StoreError::Connection(format!(
                "timed out after {:?} connecting to {}:{}",
                config.connect_timeout, config.host, config.port
            ))
        })?
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(host = %config.host, port = config.port, "redis connection established");

        Ok(Self {
            conn,
            command_timeout: config.connect_timeout,
        })
    }
}

impl SideEffectStore for RedisStore {
    async fn pop(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let popped = tokio::time::timeout(self.command_timeout, conn.lpop(key, None))
            .await
            .map_err(|_| {
                StoreError::Command(format!(
                    "LPOP {key} timed out after {:?}",
                    self.command_timeout
                ))
            })?;
        let value: Option<String> = popped?;
        Ok(value)
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_credentials_are_omitted() {
        assert_eq!(non_empty(""), None);
        assert_eq!(non_empty("secret"), Some("secret".to_owned()));
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails_with_connection_error() {
        // 포트 1은 일반적으로 열려 있지 않음
        let config = StoreConfig {
            host: "127.0.0.1".to_owned(),
            port: 1,
            connect_timeout: Duration::from_millis(500),
            ..StoreConfig::default()
        };
        let err = RedisStore::connect(&config)
            .await
            .err()
            .expect("connection to a closed port must fail");
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
