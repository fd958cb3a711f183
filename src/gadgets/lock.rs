//! Keys and the locks they fit

use tracing::{debug, info};

use crate::transform::Transform;

/// A grabbable key.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub id: String,
    pub pose: Transform,
    held: bool,
    grab_enabled: bool,
    kinematic: bool,
}

impl Key {
    pub fn new(id: impl Into<String>, pose: Transform) -> Self {
        Self {
            id: id.into(),
            pose,
            held: false,
            grab_enabled: true,
            kinematic: false,
        }
    }

    /// Grabbing is ignored while the grab interaction is disabled.
    pub fn grab(&mut self) {
        if self.grab_enabled {
            self.held = true;
        }
    }

    pub fn release(&mut self) {
        self.held = false;
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn grab_enabled(&self) -> bool {
        self.grab_enabled
    }

    pub fn is_kinematic(&self) -> bool {
        self.kinematic
    }
}

impl Default for Key {
    fn default() -> Self {
        Self::new("betaKey", Transform::identity())
    }
}

/// Lock that opens when a held key with the right id reaches its insert point.
#[derive(Debug, Clone)]
pub struct Lock {
    pub required_key_id: String,
    pub insert_point: Transform,
    /// Key must come closer than this to insert [m]
    pub insert_distance: f64,
    /// Keys outside this sphere are not considered [m]
    pub detection_radius: f64,
    inserted: Option<Key>,
}

impl Lock {
    pub fn new(required_key_id: impl Into<String>, insert_point: Transform) -> Self {
        Self {
            required_key_id: required_key_id.into(),
            insert_point,
            insert_distance: 0.1,
            detection_radius: 0.2,
            inserted: None,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.inserted.is_some()
    }

    pub fn inserted_key(&self) -> Option<&Key> {
        self.inserted.as_ref()
    }

    pub fn inserted_key_mut(&mut self) -> Option<&mut Key> {
        self.inserted.as_mut()
    }

    /// Looks for an insertable key among `keys` and takes the first match.
    ///
    /// A key qualifies when it is held, its id matches and it lies within the
    /// detection sphere and closer than `insert_distance`. The lock then owns the
    /// key: it is snapped to the insert point, made kinematic and its grab is
    /// disabled. Does nothing while already unlocked.
    pub fn check_for_insertion(&mut self, keys: &mut Vec<Key>) -> bool {
        if self.is_unlocked() {
            return false;
        }

        let found = keys.iter().position(|key| {
            let distance = (key.pose.position - self.insert_point.position).norm();
            if distance > self.detection_radius {
                return false;
            }
            debug!(
                key = %key.id,
                required = %self.required_key_id,
                held = key.held,
                distance,
                "key near lock"
            );
            key.id == self.required_key_id && key.held && distance < self.insert_distance
        });

        let Some(index) = found else {
            return false;
        };
        let mut key = keys.remove(index);
        key.pose = self.insert_point;
        key.kinematic = true;
        key.grab_enabled = false;
        key.held = false;
        info!(key = %key.id, "key inserted, lock open");
        self.inserted = Some(key);
        true
    }

    /// Holds an inserted key on the insert point, which may have moved.
    pub fn late_update(&mut self) {
        if let Some(key) = self.inserted.as_mut() {
            key.pose = self.insert_point;
            key.kinematic = true;
        }
    }

    /// Hands the inserted key back with its grab enabled and locks again.
    pub fn remove_key(&mut self) -> Option<Key> {
        let mut key = self.inserted.take()?;
        key.grab_enabled = true;
        info!(key = %key.id, "key removed, lock closed");
        Some(key)
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new("MainKey", Transform::identity())
    }
}
