//! プレイヤーID → 会話ハンドルのレジストリ
//!
//! マップ全体のロックは検索・挿入の間だけ保持し、会話そのものはエントリごとの
//! 非同期Mutexで守る。同じプレイヤーのメッセージは順番に1つずつ適用される。

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::model::Conversation;

/// 共有される会話ハンドル
pub type SharedConversation = Arc<tokio::sync::Mutex<Box<dyn Conversation>>>;

/// レジストリの保持ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// 保持する会話数の上限（超えたら最も長く使われていないものを破棄）
    pub max_sessions: Option<usize>,
    /// 最後の利用からこの時間が経った会話は破棄
    pub idle_ttl: Option<Duration>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_sessions: Some(10_000),
            idle_ttl: None,
        }
    }
}

impl RetentionPolicy {
    /// 破棄しない（プロセス終了まで増え続ける）
    pub fn unbounded() -> Self {
        Self { max_sessions: None, idle_ttl: None }
    }
}

struct Entry {
    conversation: SharedConversation,
    last_used: Instant,
    /// `Slots::order` のキー
    tick: u64,
}

/// マップ本体と、利用順の索引（古い順）
#[derive(Default)]
struct Slots {
    entries: HashMap<String, Entry>,
    order: BTreeMap<u64, String>,
    next_tick: u64,
}

impl Slots {
    fn bump(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn touch(&mut self, player_id: &str, now: Instant) -> Option<SharedConversation> {
        let tick = self.bump();
        let entry = self.entries.get_mut(player_id)?;
        self.order.remove(&entry.tick);
        entry.tick = tick;
        entry.last_used = now;
        self.order.insert(tick, player_id.to_string());
        Some(Arc::clone(&entry.conversation))
    }

    fn insert(&mut self, player_id: &str, now: Instant, conversation: SharedConversation) {
        let tick = self.bump();
        self.order.insert(tick, player_id.to_string());
        self.entries.insert(
            player_id.to_string(),
            Entry { conversation, last_used: now, tick },
        );
    }

    fn remove(&mut self, player_id: &str) -> Option<Entry> {
        let entry = self.entries.remove(player_id)?;
        self.order.remove(&entry.tick);
        Some(entry)
    }

    /// 最も長く使われていない会話を取り除く
    fn pop_oldest(&mut self) -> Option<String> {
        let (_, player_id) = self.order.pop_first()?;
        self.entries.remove(&player_id);
        Some(player_id)
    }

    /// 古い順にたどり、TTLを過ぎたものを取り除く（`now` は単調増加を前提とする）
    fn expire(&mut self, now: Instant, ttl: Duration) -> usize {
        let mut removed = 0;
        while let Some((_, player_id)) = self.order.first_key_value() {
            let expired = self
                .entries
                .get(player_id)
                .is_none_or(|e| now.saturating_duration_since(e.last_used) >= ttl);
            if !expired {
                break;
            }
            self.pop_oldest();
            removed += 1;
        }
        if removed > 0 {
            info!(target: "registry", removed, "expired idle conversations");
        }
        removed
    }
}

/// 会話レジストリ
pub struct ConversationRegistry {
    slots: Mutex<Slots>,
    policy: RetentionPolicy,
}

impl Default for ConversationRegistry {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

impl ConversationRegistry {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            policy,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // 保持しているのはマップだけなので、panic後もそのまま使える
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 既存の会話を返すか、`create` で作って登録する。2つ目の値は新規作成かどうか。
    pub fn get_or_create<F>(&self, player_id: &str, create: F) -> (SharedConversation, bool)
    where
        F: FnOnce() -> Box<dyn Conversation>,
    {
        self.get_or_create_at(player_id, Instant::now(), create)
    }

    pub fn get_or_create_at<F>(
        &self,
        player_id: &str,
        now: Instant,
        create: F,
    ) -> (SharedConversation, bool)
    where
        F: FnOnce() -> Box<dyn Conversation>,
    {
        let mut slots = self.lock();

        if let Some(conversation) = slots.touch(player_id, now) {
            return (conversation, false);
        }

        self.make_room(&mut slots, now);

        let conversation: SharedConversation = Arc::new(tokio::sync::Mutex::new(create()));
        slots.insert(player_id, now, Arc::clone(&conversation));
        debug!(target: "registry", player_id, sessions = slots.entries.len(), "conversation registered");
        (conversation, true)
    }

    /// 挿入前に、期限切れと上限超過の会話を取り除く
    fn make_room(&self, slots: &mut Slots, now: Instant) {
        if let Some(ttl) = self.policy.idle_ttl {
            slots.expire(now, ttl);
        }
        let Some(max) = self.policy.max_sessions else {
            return;
        };
        while slots.entries.len() >= max {
            let Some(oldest) = slots.pop_oldest() else {
                break;
            };
            info!(target: "registry", player_id = %oldest, "evicted least recently used conversation");
        }
    }

    /// アイドルTTLを過ぎた会話を破棄し、破棄した数を返す
    pub fn evict_idle(&self, now: Instant) -> usize {
        match self.policy.idle_ttl {
            Some(ttl) => self.lock().expire(now, ttl),
            None => 0,
        }
    }

    pub fn get(&self, player_id: &str) -> Option<SharedConversation> {
        self.lock().entries.get(player_id).map(|e| Arc::clone(&e.conversation))
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.lock().entries.contains_key(player_id)
    }

    pub fn remove(&self, player_id: &str) -> bool {
        self.lock().remove(player_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
