//! Upload flow controller.
//!
//! `Idle -> RequestingCredential -> RequestingDescriptor -> Uploading -> {Succeeded | Failed}`,
//! after which the controller returns to `Idle`. Success clears the form and
//! closes the dialog; failure keeps the entered fields so the user can resubmit.
//! There is no automatic retry.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use lyra_api_client::{ApiClient, DirectUploader, StoredObject};
use lyra_auth::SessionProvider;
use lyra_core::error::{ErrorMetadata, LogLevel};
use lyra_core::models::progress;
use lyra_core::{DocumentUploadRequest, SelectedFile, UploadError, UploadProgress};
use tokio::sync::{watch, Mutex};
use tracing::Instrument;
use uuid::Uuid;
use validator::Validate;

use crate::form::{FormField, UploadForm};
use crate::notify::{Notification, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    RequestingCredential,
    RequestingDescriptor,
    Uploading,
    Succeeded,
    Failed,
}

/// Snapshot published to observers on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowStatus {
    pub phase: FlowPhase,
    pub progress: UploadProgress,
    pub dialog_open: bool,
}

impl Default for FlowStatus {
    fn default() -> Self {
        Self {
            phase: FlowPhase::Idle,
            progress: UploadProgress::default(),
            dialog_open: false,
        }
    }
}

/// Clears the in-flight flag when the flow ends, including when the submit future is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct UploadController {
    session: Arc<dyn SessionProvider>,
    api: ApiClient,
    uploader: DirectUploader,
    notifier: Arc<dyn Notifier>,
    form: Mutex<UploadForm>,
    in_flight: AtomicBool,
    /// Bumped on every dismissal; a flow only touches UI state while its generation is current.
    generation: AtomicU64,
    status: watch::Sender<FlowStatus>,
}

impl UploadController {
    pub fn new(
        session: Arc<dyn SessionProvider>,
        api: ApiClient,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let uploader = api.uploader();
        Self::with_uploader(session, api, uploader, notifier)
    }

    pub fn with_uploader(
        session: Arc<dyn SessionProvider>,
        api: ApiClient,
        uploader: DirectUploader,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (status, _) = watch::channel(FlowStatus::default());
        Self {
            session,
            api,
            uploader,
            notifier,
            form: Mutex::new(UploadForm::default()),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            status,
        }
    }

    /// Observe phase, progress and dialog visibility.
    pub fn subscribe(&self) -> watch::Receiver<FlowStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> FlowStatus {
        *self.status.borrow()
    }

    pub fn progress(&self) -> u8 {
        self.status().progress.percent()
    }

    pub fn phase(&self) -> FlowPhase {
        self.status().phase
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn form(&self) -> UploadForm {
        self.form.lock().await.clone()
    }

    /// Show the upload dialog with progress back at zero.
    pub fn open(&self) {
        self.status.send_modify(|status| {
            status.dialog_open = true;
            status.progress.reset();
        });
    }

    /// Close the dialog. A flow still in flight keeps running but its result is discarded.
    pub fn dismiss(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.status.send_modify(|status| {
            status.dialog_open = false;
            status.phase = FlowPhase::Idle;
            status.progress.reset();
        });
    }

    pub async fn select_file(&self, file: SelectedFile) {
        self.form.lock().await.select_file(file);
    }

    pub async fn update_field(&self, field: FormField) {
        self.form.lock().await.apply(field);
    }

    /// Run the upload for the current form.
    ///
    /// A missing file or title, or a flow already in flight, is rejected before
    /// any network call. Every outcome is reported through the notifier; the
    /// result is also returned to the caller.
    pub async fn submit(&self) -> Result<StoredObject, UploadError> {
        // Taken before the slot is claimed so a dismissal at any point after this is observed.
        let generation = self.generation.load(Ordering::SeqCst);
        let (request, file) = match self.begin().await {
            Ok(started) => started,
            Err(err) => {
                self.log_failure(&err);
                self.notifier.notify(Notification::failure(
                    err.notification_title(),
                    err.client_message(),
                ));
                return Err(err);
            }
        };
        let _guard = InFlightGuard(&self.in_flight);

        let flow_id = Uuid::new_v4();
        let span = tracing::info_span!("upload_flow", %flow_id, title = %request.title);

        async move {
            let result = self.run(&request, &file, generation).await;

            if !self.is_current(generation) {
                tracing::debug!("Upload dialog was dismissed, discarding flow result");
                return result;
            }

            match &result {
                Ok(stored) => self.complete(&request, stored).await,
                Err(err) => self.fail(err),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Check preconditions and claim the in-flight slot.
    async fn begin(&self) -> Result<(DocumentUploadRequest, SelectedFile), UploadError> {
        let form = self.form.lock().await;

        let file = form
            .file
            .clone()
            .ok_or_else(|| UploadError::Validation("Please select a file to upload".to_string()))?;
        if form.title.trim().is_empty() {
            return Err(UploadError::Validation(
                "Please provide a title for the document".to_string(),
            ));
        }

        let request = DocumentUploadRequest::from_form(
            &form.title,
            form.department,
            &form.tags,
            form.visibility,
            &file,
        );
        request.validate()?;
        drop(form);

        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| UploadError::InFlight)?;

        // Each flow starts from zero.
        self.status.send_modify(|status| status.progress.reset());
        Ok((request, file))
    }

    async fn run(
        &self,
        request: &DocumentUploadRequest,
        file: &SelectedFile,
        generation: u64,
    ) -> Result<StoredObject, UploadError> {
        self.transition(generation, FlowPhase::RequestingCredential, progress::STARTED);
        let token = self.session.get_credential().await.map_err(|e| {
            tracing::warn!(error = %e, "Could not obtain a credential");
            UploadError::NoCredential(e.to_string())
        })?;
        self.transition(
            generation,
            FlowPhase::RequestingCredential,
            progress::CREDENTIAL_ACQUIRED,
        );

        self.transition(
            generation,
            FlowPhase::RequestingDescriptor,
            progress::DESCRIPTOR_REQUESTED,
        );
        let descriptor = self.api.request_upload_intent(request, &token).await?;
        tracing::debug!(
            key = descriptor.object_key().unwrap_or("-"),
            fields = descriptor.fields.len(),
            "Received upload descriptor"
        );
        self.transition(
            generation,
            FlowPhase::RequestingDescriptor,
            progress::DESCRIPTOR_RECEIVED,
        );

        let prepared = self.uploader.prepare(descriptor, file)?;
        self.transition(generation, FlowPhase::Uploading, progress::FORM_BUILT);
        self.transition(generation, FlowPhase::Uploading, progress::UPLOAD_SENT);
        self.uploader.send(prepared).await
    }

    async fn complete(&self, request: &DocumentUploadRequest, stored: &StoredObject) {
        tracing::info!(
            key = stored.key.as_deref().unwrap_or("-"),
            status = stored.status,
            "Document uploaded"
        );
        self.status.send_modify(|status| {
            status.phase = FlowPhase::Succeeded;
            status.progress.advance(progress::COMPLETE);
        });
        self.notifier.notify(Notification::success(
            "Upload complete",
            format!("\"{}\" was uploaded successfully", request.title),
        ));

        *self.form.lock().await = UploadForm::default();
        // Progress stays at 100 until the next flow or dialog opening.
        self.status.send_modify(|status| {
            status.dialog_open = false;
            status.phase = FlowPhase::Idle;
        });
    }

    fn fail(&self, err: &UploadError) {
        self.log_failure(err);
        self.status
            .send_modify(|status| status.phase = FlowPhase::Failed);
        self.notifier.notify(Notification::failure(
            err.notification_title(),
            err.client_message(),
        ));
        // Fields and progress are left as they were for a retry.
        self.status
            .send_modify(|status| status.phase = FlowPhase::Idle);
    }

    fn log_failure(&self, err: &UploadError) {
        let code = err.error_code();
        match err.log_level() {
            LogLevel::Debug => tracing::debug!(code, error = %err, "Upload not started"),
            LogLevel::Warn => tracing::warn!(code, error = %err, "Upload failed"),
            LogLevel::Error => tracing::error!(code, error = %err, "Upload failed"),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn transition(&self, generation: u64, phase: FlowPhase, percent: u8) {
        if !self.is_current(generation) {
            return;
        }
        self.status.send_if_modified(|status| {
            let moved = status.progress.advance(percent);
            let changed = status.phase != phase;
            status.phase = phase;
            moved || changed
        });
    }
}
