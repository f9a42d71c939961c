//! The serialized Registry & Messaging Store.
//!
//! [`Ledger`] owns the [`Database`] behind a single lock. Every mutating call
//! runs as one SQLite transaction while holding that lock, so uniqueness
//! checks and counters never race, and readers only ever see committed
//! state. Committed transitions are published as [`LedgerEvent`]s, in commit
//! order.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, error, info};
use w3chat_shared::constants::{EVENT_CHANNEL_CAPACITY, MAX_BATCH_CALLS};
use w3chat_shared::{Address, ChatError, FirstName, GroupId, LedgerEvent, Page};

use crate::batch::{CallResult, ReadCall};

use crate::clock::{Clock, MonotonicClock, SystemClock};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{GroupInfo, GroupMessage, PrivateMessage, User};

struct LedgerState {
    db: Database,
    clock: MonotonicClock,
}

pub struct Ledger {
    state: Mutex<LedgerState>,
    events: broadcast::Sender<LedgerEvent>,
}

impl Ledger {
    /// Wrap an opened database, stamping with the system clock.
    pub fn new(db: Database) -> Result<Self> {
        Self::with_clock(db, Box::new(SystemClock))
    }

    /// Wrap an opened database with a custom time source. The clock never
    /// hands out a timestamp older than the newest one already stored.
    pub fn with_clock(db: Database, clock: Box<dyn Clock>) -> Result<Self> {
        let floor = db.latest_timestamp()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            state: Mutex::new(LedgerState {
                db,
                clock: MonotonicClock::new(clock, floor),
            }),
            events,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Database::open_in_memory()?)
    }

    /// Receive every event committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // Identity registry
    // ------------------------------------------------------------------

    pub fn register_user(&self, caller: &Address, name: &str, image_ref: &str) -> Result<()> {
        self.apply("register_user", caller, |s| {
            let now = s.clock.stamp();
            let user = s.db.register_user(caller, name, image_ref, now)?;
            Ok((
                (),
                LedgerEvent::UserRegistered {
                    address: user.address,
                    name: user.name,
                    timestamp: now,
                },
            ))
        })
    }

    pub fn update_profile_image(&self, caller: &Address, new_image_ref: &str) -> Result<()> {
        self.apply("update_profile_image", caller, |s| {
            s.db.update_profile_image(caller, new_image_ref)?;
            Ok((
                (),
                LedgerEvent::ProfileImageUpdated {
                    address: *caller,
                    image_ref: new_image_ref.to_string(),
                },
            ))
        })
    }

    /// The stored record, or `User::default()` when `address` never
    /// registered.
    pub fn get_user_profile(&self, address: &Address) -> Result<User> {
        self.read(|db| db.user_profile(address))
    }

    pub fn is_user_registered(&self, address: &Address) -> Result<bool> {
        self.read(|db| db.is_registered(address))
    }

    /// Whether `candidate` could be used as a first name. A name held by
    /// `caller` itself counts as available.
    pub fn is_first_name_available(
        &self,
        candidate: &str,
        caller: Option<&Address>,
    ) -> Result<bool> {
        self.read(|db| db.first_name_available(candidate, caller))
    }

    /// Address of the user holding `first_name`, ignoring ASCII case.
    pub fn resolve_first_name(&self, first_name: &str) -> Result<Option<Address>> {
        self.read(|db| db.first_name_owner(&FirstName::candidate(first_name)))
    }

    pub fn get_total_users(&self) -> Result<u64> {
        self.read(|db| db.total_users())
    }

    // ------------------------------------------------------------------
    // Private messaging
    // ------------------------------------------------------------------

    pub fn send_private_message(
        &self,
        caller: &Address,
        recipient: &Address,
        content: &str,
    ) -> Result<()> {
        self.apply("send_private_message", caller, |s| {
            let now = s.clock.stamp();
            let msg = s.db.send_private_message(caller, recipient, content, now)?;
            Ok((
                (),
                LedgerEvent::PrivateMessageSent {
                    from: msg.sender,
                    to: *recipient,
                    timestamp: msg.timestamp,
                },
            ))
        })
    }

    pub fn get_private_messages(
        &self,
        user_a: &Address,
        user_b: &Address,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PrivateMessage>> {
        self.read(|db| db.get_private_messages(user_a, user_b, Page::new(offset, limit)))
    }

    pub fn get_private_message_count(&self, user_a: &Address, user_b: &Address) -> Result<u64> {
        self.read(|db| db.private_message_count(user_a, user_b))
    }

    /// A window of the thread together with the thread's total length, both
    /// read from the same committed state.
    pub fn get_private_page(
        &self,
        user_a: &Address,
        user_b: &Address,
        page: Page,
    ) -> Result<(Vec<PrivateMessage>, u64)> {
        self.read(|db| {
            let messages = db.get_private_messages(user_a, user_b, page)?;
            let total = db.private_message_count(user_a, user_b)?;
            Ok((messages, total))
        })
    }

    // ------------------------------------------------------------------
    // Group messaging
    // ------------------------------------------------------------------

    pub fn create_group_chat(
        &self,
        caller: &Address,
        name: &str,
        initial_members: &[Address],
    ) -> Result<GroupId> {
        self.apply("create_group_chat", caller, |s| {
            let now = s.clock.stamp();
            let group = s.db.create_group(caller, name, initial_members, now)?;
            Ok((
                group.id,
                LedgerEvent::GroupCreated {
                    group_id: group.id,
                    name: group.name,
                    admin: group.admin,
                    member_count: group.members.len(),
                },
            ))
        })
    }

    pub fn send_group_message(&self, caller: &Address, group_id: GroupId, content: &str) -> Result<()> {
        self.apply("send_group_message", caller, |s| {
            let now = s.clock.stamp();
            let msg = s.db.send_group_message(caller, group_id, content, now)?;
            Ok((
                (),
                LedgerEvent::GroupMessageSent {
                    group_id,
                    sender: msg.sender,
                    timestamp: msg.timestamp,
                },
            ))
        })
    }

    pub fn add_group_member(
        &self,
        caller: &Address,
        group_id: GroupId,
        new_member: &Address,
    ) -> Result<()> {
        self.apply("add_group_member", caller, |s| {
            s.db.add_group_member(caller, group_id, new_member)?;
            Ok((
                (),
                LedgerEvent::GroupMemberAdded {
                    group_id,
                    member: *new_member,
                },
            ))
        })
    }

    pub fn get_group_info(&self, group_id: GroupId) -> Result<GroupInfo> {
        self.read(|db| db.get_group(group_id).map(GroupInfo::from))
    }

    pub fn get_group_messages(
        &self,
        group_id: GroupId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<GroupMessage>> {
        self.read(|db| db.get_group_messages(group_id, Page::new(offset, limit)))
    }

    pub fn get_group_message_count(&self, group_id: GroupId) -> Result<u64> {
        self.read(|db| db.group_message_count(group_id))
    }

    /// A window of the group log together with its total length, both read
    /// from the same committed state.
    pub fn get_group_page(&self, group_id: GroupId, page: Page) -> Result<(Vec<GroupMessage>, u64)> {
        self.read(|db| {
            let messages = db.get_group_messages(group_id, page)?;
            let total = db.group_message_count(group_id)?;
            Ok((messages, total))
        })
    }

    pub fn get_group_count(&self) -> Result<u64> {
        self.read(|db| db.group_count())
    }

    pub fn get_user_groups(&self, address: &Address) -> Result<Vec<GroupId>> {
        self.read(|db| db.groups_for_member(address))
    }

    // ------------------------------------------------------------------
    // Batched reads
    // ------------------------------------------------------------------

    /// Run every call against one snapshot. A rejected call yields a failed
    /// [`CallResult`] and does not stop the batch; a storage error does.
    pub fn batch_read(&self, calls: &[ReadCall]) -> Result<Vec<CallResult>> {
        if calls.len() > MAX_BATCH_CALLS {
            return Err(ChatError::BatchTooLarge {
                len: calls.len(),
                max: MAX_BATCH_CALLS,
            }
            .into());
        }
        self.read(|db| calls.iter().map(|call| db.try_read_call(call)).collect())
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn read<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let state = self.lock()?;
        f(&state.db)
    }

    /// Run one state transition under the lock and publish its event if it
    /// committed.
    fn apply<T>(
        &self,
        op: &'static str,
        caller: &Address,
        f: impl FnOnce(&mut LedgerState) -> Result<(T, LedgerEvent)>,
    ) -> Result<T> {
        let mut state = self.lock()?;

        match f(&mut *state) {
            Ok((value, event)) => {
                info!(op, caller = %caller, event = event.name(), "committed");
                // No subscribers is not an error.
                let _ = self.events.send(event);
                Ok(value)
            }
            Err(StoreError::Rejected(reason)) => {
                debug!(op, caller = %caller, kind = reason.kind(), %reason, "rejected");
                Err(StoreError::Rejected(reason))
            }
            Err(e) => {
                error!(op, caller = %caller, error = %e, "ledger write failed");
                Err(e)
            }
        }
    }
}
