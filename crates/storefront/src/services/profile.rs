//! Profile synchronization with the identity provider.

use kaalika_core::{UserProfile, display_name};
use serde::Deserialize;
use tracing::instrument;

use crate::db::ProfileRepository;
use crate::firebase::VerifiedIdentity;
use crate::store::{DocumentStore, StoreError};

/// Body of a profile update. Absent fields are left as stored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Fetch the caller's profile, creating it and filling missing contact
/// fields from the verified token claims.
///
/// # Errors
///
/// Returns `StoreError` if a read or write fails.
#[instrument(skip_all, fields(uid = %identity.uid))]
pub async fn load_profile(
    store: &dyn DocumentStore,
    identity: &VerifiedIdentity,
) -> Result<UserProfile, StoreError> {
    let repo = ProfileRepository::new(store);
    let stored = repo.get(&identity.uid).await?;
    if stored.is_none() {
        repo.create(&identity.uid, &UserProfile::default()).await?;
    }
    let mut profile = stored.unwrap_or_default();

    let name = profile.name_missing().then(|| {
        display_name(identity.name.as_deref(), identity.email.as_deref())
    });
    let email = if profile.email_missing() {
        identity.email.clone().filter(|e| !e.trim().is_empty())
    } else {
        None
    };

    if name.is_some() || email.is_some() {
        repo.merge_contact(&identity.uid, name.as_deref(), email.as_deref())
            .await?;
        tracing::debug!(
            name_filled = name.is_some(),
            email_filled = email.is_some(),
            "Profile contact fields synced"
        );
        if name.is_some() {
            profile.name = name;
        }
        if email.is_some() {
            profile.email = email;
        }
    }

    Ok(profile)
}

/// Merge the provided fields onto the caller's profile.
///
/// # Errors
///
/// Returns `StoreError` if the write fails.
#[instrument(skip_all, fields(uid = %identity.uid))]
pub async fn update_profile(
    store: &dyn DocumentStore,
    identity: &VerifiedIdentity,
    update: &ProfileUpdate,
) -> Result<(), StoreError> {
    ProfileRepository::new(store)
        .merge_contact(&identity.uid, update.name.as_deref(), update.email.as_deref())
        .await
}
