use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::models::{MessageModel, RoomModel};
use super::repository::{JoinOutcome, RoomStore};
use crate::shared::AppError;

/// Appends a token to the room's connected list iff a slot is free,
/// entirely server-side so concurrent admissions from any number of
/// service instances serialize inside Redis.
///
/// KEYS[1] = meta key, ARGV[1] = token, ARGV[2] = capacity.
/// Returns {status, connected_json, created_at} with status one of
/// "joined" | "already" | "full" | "not-found".
const CONDITIONAL_JOIN_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return {'not-found'}
end
local raw = redis.call('HGET', KEYS[1], 'connected')
local connected = cjson.decode(raw)
if type(connected) ~= 'table' then
  connected = {}
end
for _, token in ipairs(connected) do
  if token == ARGV[1] then
    return {'already', raw, redis.call('HGET', KEYS[1], 'created_at')}
  end
end
if #connected >= tonumber(ARGV[2]) then
  return {'full'}
end
table.insert(connected, ARGV[1])
local encoded = cjson.encode(connected)
redis.call('HSET', KEYS[1], 'connected', encoded)
return {'joined', encoded, redis.call('HGET', KEYS[1], 'created_at')}
"#;

/// Appends a message and pins the message list to the metadata's expiry
/// horizon, so both keys always vanish together.
///
/// KEYS[1] = meta key, KEYS[2] = messages key.
/// ARGV[1..3] = JSON-encoded sender, text, timestamp.
/// Returns the assigned message id, or nil if the room is gone.
const APPEND_MESSAGE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return nil
end
local id = redis.call('HINCRBY', KEYS[1], 'seq', 1)
local payload = '{"id":' .. id .. ',"sender":' .. ARGV[1] .. ',"text":' .. ARGV[2] .. ',"timestamp":' .. ARGV[3] .. '}'
redis.call('RPUSH', KEYS[2], payload)
local ttl = redis.call('PTTL', KEYS[1])
if ttl > 0 then
  redis.call('PEXPIRE', KEYS[2], ttl)
end
return id
"#;

/// Redis-backed implementation of RoomStore for production
///
/// Room metadata lives in a hash, the message list in a list; both carry
/// the same TTL so Redis' native expiry purges the room as one unit. The
/// two mutating hot paths (join, append) run as Lua scripts, which is
/// what makes them single transactional steps.
pub struct RedisRoomStore {
    conn: ConnectionManager,
    join_script: Script,
    append_script: Script,
}

impl RedisRoomStore {
    /// Connects to the Redis instance at `url`
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(url).map_err(store_error)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(store_error)?;

        info!("Connected to Redis room store");

        Ok(Self {
            conn,
            join_script: Script::new(CONDITIONAL_JOIN_SCRIPT),
            append_script: Script::new(APPEND_MESSAGE_SCRIPT),
        })
    }

    fn meta_key(room_id: &str) -> String {
        format!("room:{}:meta", room_id)
    }

    fn messages_key(room_id: &str) -> String {
        format!("room:{}:messages", room_id)
    }

    fn parse_meta(room_id: &str, fields: HashMap<String, String>) -> Option<RoomModel> {
        if fields.is_empty() {
            return None;
        }

        let connected = fields
            .get("connected")
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        let created_at = fields
            .get("created_at")
            .and_then(|raw| parse_created_at(raw));

        Some(RoomModel {
            id: room_id.to_string(),
            connected,
            created_at: created_at.unwrap_or_else(Utc::now),
        })
    }
}

fn store_error(e: redis::RedisError) -> AppError {
    AppError::StoreUnavailable(e.to_string())
}

fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl RoomStore for RedisRoomStore {
    #[instrument(skip(self, room))]
    async fn create_room(&self, room: &RoomModel, ttl: Duration) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let meta_key = Self::meta_key(&room.id);
        let connected = serde_json::to_string(&room.connected).map_err(|_| AppError::Internal)?;

        redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(&meta_key)
            .arg("created_at")
            .arg(room.created_at.to_rfc3339())
            .arg("connected")
            .arg(connected)
            .arg("seq")
            .arg(0)
            .ignore()
            .cmd("EXPIRE")
            .arg(&meta_key)
            .arg(ttl.as_secs())
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(store_error)?;

        debug!(room_id = %room.id, ttl_secs = ttl.as_secs(), "Room created in Redis");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_meta(&self, room_id: &str) -> Result<Option<RoomModel>, AppError> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(Self::meta_key(room_id))
            .await
            .map_err(store_error)?;

        Ok(Self::parse_meta(room_id, fields))
    }

    #[instrument(skip(self, token))]
    async fn conditional_join(&self, room_id: &str, token: &str) -> Result<JoinOutcome, AppError> {
        let mut conn = self.conn.clone();

        let reply: Vec<String> = self
            .join_script
            .key(Self::meta_key(room_id))
            .arg(token)
            .arg(RoomModel::CAPACITY)
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;

        let status = reply.first().map(String::as_str).unwrap_or("not-found");
        match status {
            "joined" | "already" => {
                let connected = reply
                    .get(1)
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or_default();
                let created_at = reply
                    .get(2)
                    .and_then(|raw| parse_created_at(raw))
                    .unwrap_or_else(Utc::now);

                let room = RoomModel {
                    id: room_id.to_string(),
                    connected,
                    created_at,
                };

                if status == "joined" {
                    info!(
                        room_id = %room_id,
                        connected = room.connected.len(),
                        "Token joined room (atomic)"
                    );
                    Ok(JoinOutcome::Joined(room))
                } else {
                    debug!(room_id = %room_id, "Token already connected");
                    Ok(JoinOutcome::AlreadyConnected(room))
                }
            }
            "full" => {
                debug!(room_id = %room_id, "Room is full");
                Ok(JoinOutcome::Full)
            }
            _ => {
                debug!(room_id = %room_id, "Room not found");
                Ok(JoinOutcome::NotFound)
            }
        }
    }

    #[instrument(skip(self))]
    async fn remaining_ttl(&self, room_id: &str) -> Result<Option<Duration>, AppError> {
        let mut conn = self.conn.clone();
        let ttl: i64 = conn
            .ttl(Self::meta_key(room_id))
            .await
            .map_err(store_error)?;

        // -2 = key gone, -1 = no expiry set; neither counts as a live room
        Ok(match ttl {
            secs if secs >= 0 => Some(Duration::from_secs(secs as u64)),
            _ => None,
        })
    }

    #[instrument(skip(self, sender, text))]
    async fn append_message(
        &self,
        room_id: &str,
        sender: &str,
        text: &str,
    ) -> Result<Option<MessageModel>, AppError> {
        let mut conn = self.conn.clone();
        let timestamp = Utc::now();

        let sender_json = serde_json::to_string(sender).map_err(|_| AppError::Internal)?;
        let text_json = serde_json::to_string(text).map_err(|_| AppError::Internal)?;
        let timestamp_json =
            serde_json::to_string(&timestamp).map_err(|_| AppError::Internal)?;

        let id: Option<u64> = self
            .append_script
            .key(Self::meta_key(room_id))
            .key(Self::messages_key(room_id))
            .arg(sender_json)
            .arg(text_json)
            .arg(timestamp_json)
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;

        Ok(id.map(|id| {
            debug!(room_id = %room_id, message_id = id, "Message appended");
            MessageModel {
                id,
                sender: sender.to_string(),
                text: text.to_string(),
                timestamp,
            }
        }))
    }

    #[instrument(skip(self))]
    async fn list_messages(&self, room_id: &str) -> Result<Option<Vec<MessageModel>>, AppError> {
        let mut conn = self.conn.clone();

        let (exists, raw): (i64, Vec<String>) = redis::pipe()
            .atomic()
            .cmd("EXISTS")
            .arg(Self::meta_key(room_id))
            .cmd("LRANGE")
            .arg(Self::messages_key(room_id))
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;

        if exists == 0 {
            return Ok(None);
        }

        let messages = raw
            .iter()
            .filter_map(|payload| match serde_json::from_str(payload) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(room_id = %room_id, error = %e, "Dropping malformed message entry");
                    None
                }
            })
            .collect();

        Ok(Some(messages))
    }

    #[instrument(skip(self))]
    async fn destroy(&self, room_id: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();

        // One DEL covering both keys keeps the removal atomic
        let removed: i64 = conn
            .del(vec![Self::meta_key(room_id), Self::messages_key(room_id)])
            .await
            .map_err(store_error)?;

        if removed > 0 {
            info!(room_id = %room_id, "Room destroyed");
        } else {
            debug!(room_id = %room_id, "Destroy on absent room (no-op)");
        }

        Ok(removed > 0)
    }
}
