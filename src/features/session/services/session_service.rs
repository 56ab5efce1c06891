use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use validator::Validate;

use crate::core::error::Result;
use crate::features::gamification::{award_xp, NotificationBus, XpAward};
use crate::features::session::dtos::{RegisterDto, SignInDto};
use crate::features::session::models::{Identity, NewIdentity};
use crate::modules::backend::Backend;

/// Session and identity store.
///
/// Holds the currently authenticated identity and drives the XP award
/// path. One instance per application root, passed to dependent stores
/// explicitly.
pub struct SessionService {
    backend: Arc<dyn Backend>,
    bus: Arc<NotificationBus>,
    current: RwLock<Option<Identity>>,
    /// Last congratulated level per identity. In-memory and per session:
    /// it resets on restart, so a level congratulated before a reload can
    /// congratulate again afterwards.
    congratulated: Mutex<HashMap<i64, i64>>,
}

impl SessionService {
    pub fn new(backend: Arc<dyn Backend>, bus: Arc<NotificationBus>) -> Self {
        Self {
            backend,
            bus,
            current: RwLock::new(None),
            congratulated: Mutex::new(HashMap::new()),
        }
    }

    /// The currently authenticated identity, if any.
    pub fn current(&self) -> Option<Identity> {
        self.current.read().unwrap().clone()
    }

    pub async fn sign_in(&self, dto: SignInDto) -> Result<Identity> {
        dto.validate()?;
        let identity = self.backend.authenticate(&dto.email, &dto.password).await?;
        tracing::info!("Signed in identity {} ({})", identity.id, identity.email);
        *self.current.write().unwrap() = Some(identity.clone());
        Ok(identity)
    }

    pub async fn register(&self, dto: RegisterDto) -> Result<Identity> {
        dto.validate()?;
        let identity = self
            .backend
            .register(NewIdentity {
                display_name: dto.display_name,
                email: dto.email,
                password: dto.password,
                role: dto.role,
            })
            .await?;
        tracing::info!("Registered identity {} ({})", identity.id, identity.email);
        *self.current.write().unwrap() = Some(identity.clone());
        Ok(identity)
    }

    /// Restore a persisted session from the auth service, if one exists.
    pub async fn restore(&self) -> Result<Option<Identity>> {
        let identity = self.backend.restore_session().await?;
        *self.current.write().unwrap() = identity.clone();
        Ok(identity)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.backend.sign_out().await?;
        *self.current.write().unwrap() = None;
        Ok(())
    }

    /// Award XP to an identity.
    ///
    /// The stored XP is re-read from the service first; the local cache
    /// may be stale relative to concurrent mutations. XP and level are
    /// persisted together, then (for the current identity only) a
    /// level-up fires if the new level exceeds the per-session
    /// high-water mark, and an xp-change fires for every successful
    /// award. Any failure before the persist succeeds leaves cache,
    /// high-water mark, and bus untouched.
    pub async fn award_xp(&self, identity_id: i64, delta: i64) -> Result<XpAward> {
        let stored = self.backend.identity_by_id(identity_id).await?;
        let award = award_xp(stored.xp, delta);

        self.backend
            .update_xp(identity_id, award.xp, award.level)
            .await?;
        tracing::info!(
            "Awarded {} XP to identity {}: xp={}, level={}",
            delta,
            identity_id,
            award.xp,
            award.level
        );

        let is_current = self
            .current
            .read()
            .unwrap()
            .as_ref()
            .map(|c| c.id == identity_id)
            .unwrap_or(false);

        if is_current {
            let crossed = {
                let mut marks = self.congratulated.lock().unwrap();
                // First award this session: baseline is the level the
                // identity held going into this mutation
                let mark = marks.entry(identity_id).or_insert(stored.level);
                if award.level > *mark {
                    *mark = award.level;
                    true
                } else {
                    false
                }
            };
            if crossed {
                self.bus.publish_level_up(award.level);
            }

            let mut current = self.current.write().unwrap();
            if let Some(ref mut identity) = *current {
                identity.xp = award.xp;
                identity.level = award.level;
            }
        }

        // Strict superset signal: every successful award fires it
        self.bus.publish_xp_change(award.xp);
        Ok(award)
    }
}
