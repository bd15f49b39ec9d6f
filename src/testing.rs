//! In-memory stand-ins for the Postgres stores.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::auth::session::{new_session_id, SessionData, SessionStore};
use crate::db::{DbProbe, ProbeInfo, StoreError};
use crate::donations::repo::DonationRepo;
use crate::donations::repo_types::{Donation, NewDonation};
use crate::users::{Role, User, UserOrder, UserRepo, UserUpdate};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    donations: Vec<Donation>,
    sessions: HashMap<String, (SessionData, OffsetDateTime)>,
    next_user_id: i32,
    next_donation_id: i32,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    down: AtomicBool,
}

fn violation(constraint: &str) -> StoreError {
    StoreError::ConstraintViolation {
        constraint: constraint.into(),
        message: format!("violates {constraint}"),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later call fails with `Unavailable` while set.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check_up(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    pub fn users_snapshot(&self) -> Vec<User> {
        self.tables.lock().unwrap().users.clone()
    }

    pub fn donations_snapshot(&self) -> Vec<Donation> {
        self.tables.lock().unwrap().donations.clone()
    }

    pub fn session_count(&self) -> usize {
        self.tables.lock().unwrap().sessions.len()
    }

    /// Deletes the user row and, like the FK cascade, their donations. Sessions are kept.
    pub fn remove_user(&self, id: i32) {
        let mut t = self.tables.lock().unwrap();
        t.users.retain(|u| u.id != id);
        t.donations.retain(|d| d.user_id != id);
    }

    /// Inserts a user with a real argon2 hash of `password`.
    pub fn seed_user(&self, email: &str, password: &str, role: Role) -> User {
        let hash = crate::auth::password::hash_password(password).unwrap();
        let mut t = self.tables.lock().unwrap();
        t.next_user_id += 1;
        let user = User {
            id: t.next_user_id,
            email: email.into(),
            password_hash: hash,
            role,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        user
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check_up()?;
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        self.check_up()?;
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list(&self, order: UserOrder) -> Result<Vec<User>, StoreError> {
        self.check_up()?;
        let mut users = self.tables.lock().unwrap().users.clone();
        match order {
            UserOrder::EmailAsc => users.sort_by(|a, b| a.email.cmp(&b.email)),
            UserOrder::NewestFirst => {
                users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
        }
        Ok(users)
    }

    async fn email_taken(&self, email: &str, excluding: Option<i32>) -> Result<bool, StoreError> {
        self.check_up()?;
        let t = self.tables.lock().unwrap();
        Ok(t
            .users
            .iter()
            .any(|u| u.email == email && Some(u.id) != excluding))
    }

    async fn create(&self, email: &str, password_hash: &str, role: Role) -> Result<User, StoreError> {
        self.check_up()?;
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == email) {
            return Err(violation("users_email_key"));
        }
        t.next_user_id += 1;
        let user = User {
            id: t.next_user_id,
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn create_if_absent(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Option<User>, StoreError> {
        match UserRepo::create(self, email, password_hash, role).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_constraint_violation() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update(&self, id: i32, update: &UserUpdate) -> Result<bool, StoreError> {
        self.check_up()?;
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == update.email && u.id != id) {
            return Err(violation("users_email_key"));
        }
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        user.email = update.email.clone();
        user.role = update.role;
        if let Some(hash) = &update.password_hash {
            user.password_hash = hash.clone();
        }
        Ok(true)
    }
}

#[async_trait]
impl DonationRepo for MemoryStore {
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Donation>, StoreError> {
        self.check_up()?;
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<Donation> = t
            .donations
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.donated_on.cmp(&a.donated_on).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn create(&self, donation: &NewDonation) -> Result<(), StoreError> {
        self.check_up()?;
        let mut t = self.tables.lock().unwrap();
        if donation.amount <= Decimal::ZERO {
            return Err(violation("donations_amount_check"));
        }
        if !t.users.iter().any(|u| u.id == donation.user_id) {
            return Err(violation("donations_user_id_fkey"));
        }
        t.next_donation_id += 1;
        let row = Donation {
            id: t.next_donation_id,
            user_id: donation.user_id,
            amount: donation.amount,
            currency: donation.currency.clone(),
            donated_on: donation.donated_on,
            note: donation.note.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.donations.push(row);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, data: &SessionData, expire: OffsetDateTime) -> Result<String, StoreError> {
        self.check_up()?;
        let sid = new_session_id();
        self.tables
            .lock()
            .unwrap()
            .sessions
            .insert(sid.clone(), (data.clone(), expire));
        Ok(sid)
    }

    async fn read(&self, sid: &str, now: OffsetDateTime) -> Result<Option<SessionData>, StoreError> {
        self.check_up()?;
        let t = self.tables.lock().unwrap();
        Ok(t
            .sessions
            .get(sid)
            .filter(|(_, expire)| now < *expire)
            .map(|(data, _)| data.clone()))
    }

    async fn destroy(&self, sid: &str) -> Result<(), StoreError> {
        self.check_up()?;
        self.tables.lock().unwrap().sessions.remove(sid);
        Ok(())
    }

    async fn sweep_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        self.check_up()?;
        let mut t = self.tables.lock().unwrap();
        let before = t.sessions.len();
        t.sessions.retain(|_, (_, expire)| now < *expire);
        Ok((before - t.sessions.len()) as u64)
    }
}

#[async_trait]
impl DbProbe for MemoryStore {
    async fn probe(&self) -> Result<ProbeInfo, StoreError> {
        self.check_up()?;
        Ok(ProbeInfo {
            now: OffsetDateTime::now_utc(),
            version: "memory".into(),
        })
    }
}
