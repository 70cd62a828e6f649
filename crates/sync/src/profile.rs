//! User profile screen logic: load-or-create and edit.

use std::sync::Arc;

use recipeshare_core::UserProfile;
use recipeshare_remote::{ImageUpload, ObjectStore, PROFILE_IMAGES, ProfileDirectory, Session, SessionProvider};

use crate::error::SyncError;

pub struct ProfileService {
    directory: Arc<dyn ProfileDirectory>,
    session: Arc<dyn SessionProvider>,
    objects: Option<Arc<dyn ObjectStore>>,
}

impl ProfileService {
    pub fn new(directory: Arc<dyn ProfileDirectory>, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            directory,
            session,
            objects: None,
        }
    }

    pub fn with_object_store(mut self, objects: Arc<dyn ObjectStore>) -> Self {
        self.objects = Some(objects);
        self
    }

    fn session(&self) -> Result<Session, SyncError> {
        self.session.current().ok_or(SyncError::NotAuthenticated)
    }

    /// The signed-in user's profile. A first visit creates the document,
    /// seeded with the session's display name.
    pub async fn load_or_init(&self) -> Result<UserProfile, SyncError> {
        let session = self.session()?;
        if let Some(profile) = self.directory.get(&session.user_id).await? {
            return Ok(profile);
        }

        let profile = UserProfile::new(
            session.user_id.clone(),
            session.display_name.clone().unwrap_or_default(),
        );
        self.directory
            .put(profile.clone())
            .await
            .map_err(|err| SyncError::remote_write(session.user_id.as_str(), err))?;

        tracing::info!(user = %session.user_id, "profile created");
        Ok(profile)
    }

    /// Rename and optionally replace the avatar. The avatar is uploaded
    /// first; an upload failure leaves the profile untouched.
    pub async fn update_profile(
        &self,
        name: &str,
        image: Option<ImageUpload>,
    ) -> Result<UserProfile, SyncError> {
        let session = self.session()?;
        let mut profile = self
            .directory
            .get(&session.user_id)
            .await?
            .unwrap_or_else(|| UserProfile::new(session.user_id.clone(), ""));

        if let Some(image) = image {
            let objects = self
                .objects
                .as_ref()
                .ok_or_else(|| SyncError::UploadFailed("no object store configured".into()))?;
            profile.profile_image_url = Some(objects.upload(PROFILE_IMAGES, image).await?);
        }
        profile.name = name.trim().to_string();

        self.directory
            .put(profile.clone())
            .await
            .map_err(|err| SyncError::remote_write(session.user_id.as_str(), err))?;

        tracing::info!(user = %session.user_id, "profile updated");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipeshare_core::UserId;
    use recipeshare_remote::{InMemoryObjectStore, InMemoryProfileDirectory, InMemorySession};

    fn service(session: InMemorySession) -> (ProfileService, Arc<InMemoryProfileDirectory>, Arc<InMemoryObjectStore>) {
        let directory = Arc::new(InMemoryProfileDirectory::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let service = ProfileService::new(directory.clone(), Arc::new(session))
            .with_object_store(objects.clone());
        (service, directory, objects)
    }

    fn ada() -> InMemorySession {
        InMemorySession::signed_in(Session::new(UserId::new("u1")).with_display_name("Ada"))
    }

    #[tokio::test]
    async fn first_load_creates_profile_from_session() {
        let (service, directory, _) = service(ada());

        let profile = service.load_or_init().await.unwrap();
        assert_eq!(profile.name, "Ada");
        assert!(profile.profile_image_url.is_none());
        assert_eq!(directory.get(&UserId::new("u1")).await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn update_uploads_avatar_and_overwrites() {
        let (service, _, objects) = service(ada());
        service.load_or_init().await.unwrap();

        let updated = service
            .update_profile(" Ada L. ", Some(ImageUpload::new(vec![9; 4], "image/jpeg")))
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada L.");
        let url = updated.profile_image_url.unwrap();
        assert!(url.contains("profile_images/"));
        assert!(objects.get_by_url(&url).is_some());
    }

    #[tokio::test]
    async fn failed_upload_leaves_profile_untouched() {
        let (service, directory, objects) = service(ada());
        let before = service.load_or_init().await.unwrap();
        objects.set_failing(true);

        let err = service
            .update_profile("New name", Some(ImageUpload::new(vec![1], "image/png")))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::UploadFailed(_)));
        assert_eq!(directory.get(&UserId::new("u1")).await.unwrap(), Some(before));
    }

    #[tokio::test]
    async fn signed_out_and_offline_are_reported() {
        let (signed_out, _, _) = service(InMemorySession::new());
        assert_eq!(signed_out.load_or_init().await.unwrap_err(), SyncError::NotAuthenticated);

        let (service, directory, _) = service(ada());
        directory.set_offline(true);
        assert!(matches!(
            service.load_or_init().await.unwrap_err(),
            SyncError::RemoteUnavailable(_)
        ));
    }
}
