//! Orchestrates generation, saving, preview and export for the working draft.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{
    error::{LifecycleError, Result},
    export::{self, Artifact},
    generator::{default_name, GenerationClient},
    models::{Draft, GameRecord},
    preview::{PreviewHandle, Surface},
    repository::Repository,
    store::KeyValueStore,
};

/// Identifies one generation request for the current draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    id: u64,
    prompt: String,
}

impl GenerationTicket {
    /// Sequence number of the request.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Prompt snapshot the request was issued with.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// What happened to a generation result handed back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The draft now holds the new code.
    Applied,
    /// The request was cancelled or superseded; the draft is untouched.
    Stale,
}

/// Holds the working draft and dispatches user actions.
pub struct LifecycleController<S> {
    repository: Repository<S>,
    client: GenerationClient,
    preview: PreviewHandle,
    draft: Draft,
    next_ticket: u64,
    pending: Option<u64>,
}

impl<S: KeyValueStore> LifecycleController<S> {
    /// Build a controller over an initialised repository.
    pub fn new(repository: Repository<S>, client: GenerationClient) -> Self {
        Self {
            repository,
            client,
            preview: PreviewHandle::new(),
            draft: Draft::default(),
            next_ticket: 0,
            pending: None,
        }
    }

    /// Current working draft.
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Saved games.
    pub fn repository(&self) -> &Repository<S> {
        &self.repository
    }

    /// Generation backend, cloneable into a background task.
    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    /// Shared preview engine.
    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    /// Replace the draft prompt.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.draft.prompt = prompt.into();
    }

    /// Replace the draft name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
    }

    /// True while a generation request is outstanding.
    pub fn is_generating(&self) -> bool {
        self.pending.is_some()
    }

    /// Reserve the single generation slot for the current prompt.
    pub fn begin_generation(&mut self) -> Result<GenerationTicket> {
        if self.draft.prompt.trim().is_empty() {
            return Err(LifecycleError::validation(
                "Please enter a game description",
            ));
        }
        if self.pending.is_some() {
            return Err(LifecycleError::validation(
                "A game is already being generated",
            ));
        }
        self.next_ticket += 1;
        self.pending = Some(self.next_ticket);
        debug!(ticket = self.next_ticket, "Generation started");
        Ok(GenerationTicket {
            id: self.next_ticket,
            prompt: self.draft.prompt.clone(),
        })
    }

    /// Apply the result of a request started with [`Self::begin_generation`].
    ///
    /// Results for anything but the outstanding ticket are dropped. A failed
    /// generation leaves the draft exactly as it was.
    pub fn finish_generation(
        &mut self,
        ticket: &GenerationTicket,
        result: Result<String>,
    ) -> Result<GenerationOutcome> {
        if self.pending != Some(ticket.id) {
            debug!(ticket = ticket.id, "Ignoring stale generation result");
            return Ok(GenerationOutcome::Stale);
        }
        self.pending = None;

        let code = match result {
            Ok(code) if !code.trim().is_empty() => code,
            Ok(_) => {
                return Err(LifecycleError::Network(
                    "generation returned no code".to_string(),
                ))
            }
            Err(err) => {
                warn!(ticket = ticket.id, "Generation failed: {err}");
                return Err(err);
            }
        };

        self.draft.prompt = ticket.prompt.clone();
        self.draft.code = code;
        if self.draft.name.trim().is_empty() {
            self.draft.name = default_name(&ticket.prompt);
        }
        info!(ticket = ticket.id, bytes = self.draft.code.len(), "Game generated");
        Ok(GenerationOutcome::Applied)
    }

    /// Abandon the outstanding request; its result will be stale.
    pub fn cancel_generation(&mut self) {
        if let Some(id) = self.pending.take() {
            debug!(ticket = id, "Generation cancelled");
        }
    }

    /// Generate code for the draft prompt and apply it.
    pub async fn generate(&mut self) -> Result<GenerationOutcome> {
        let ticket = self.begin_generation()?;
        let client = self.client.clone();
        let result = client.generate(ticket.prompt()).await;
        self.finish_generation(&ticket, result)
    }

    /// Save the draft as a new record.
    pub fn save(&mut self) -> Result<GameRecord> {
        self.check_saveable()?;
        self.repository.create(&self.draft)
    }

    /// Overwrite an existing record with the draft.
    pub fn save_over(&mut self, id: &str) -> Result<GameRecord> {
        self.check_saveable()?;
        self.repository.update(id, &self.draft)
    }

    fn check_saveable(&self) -> Result<()> {
        if self.draft.name.trim().is_empty() {
            return Err(LifecycleError::validation("Please enter a game title"));
        }
        if !self.draft.has_code() {
            return Err(LifecycleError::validation("No game code to save"));
        }
        Ok(())
    }

    /// Replace the draft with a saved record.
    pub fn load(&mut self, id: &str) -> Result<GameRecord> {
        let record = self.repository.load(id)?;
        self.cancel_generation();
        self.preview.stop();
        self.draft = record.to_draft();
        info!(id = %record.id, name = %record.name, "Game loaded into draft");
        Ok(record)
    }

    /// Delete a saved record; unknown ids are ignored.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.repository.delete(id)
    }

    /// All saved records, oldest first.
    pub fn list(&self) -> Vec<GameRecord> {
        self.repository.list()
    }

    /// Saved records matching `query`.
    pub fn search(&self, query: &str) -> Vec<GameRecord> {
        self.repository.search(query)
    }

    /// Package the draft code for download.
    pub fn export(&self) -> Result<Artifact> {
        if !self.draft.has_code() {
            return Err(LifecycleError::validation("No game to export"));
        }
        Ok(export::export(&self.draft.code, &self.export_name()))
    }

    /// Export the draft into `dir`.
    pub fn export_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.export()?.write_to(dir)
    }

    fn export_name(&self) -> String {
        let name = self.draft.name.trim();
        if name.is_empty() {
            default_name(&self.draft.prompt)
        } else {
            name.to_string()
        }
    }

    /// Start previewing the draft on `surface`.
    pub fn start_preview<T: Surface + ?Sized>(&self, surface: &T) -> Result<()> {
        if !self.draft.has_code() {
            return Err(LifecycleError::validation("No game to play"));
        }
        self.preview.start(surface)
    }

    /// Stop the preview; takes effect before the next frame.
    pub fn stop_preview(&self) {
        self.preview.stop();
    }

    /// Drop the unsaved draft.
    pub fn discard_draft(&mut self) {
        self.cancel_generation();
        self.preview.stop();
        self.draft = Draft::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        preview::{Canvas, FrameOutcome, PreviewState},
        store::MemoryStore,
    };

    fn controller() -> LifecycleController<MemoryStore> {
        let repository = Repository::init(MemoryStore::new()).unwrap();
        LifecycleController::new(repository, GenerationClient::Local)
    }

    #[tokio::test]
    async fn generate_fills_code_and_default_name() {
        let mut ctl = controller();
        ctl.set_prompt("Space shooter with aliens");
        assert_eq!(ctl.generate().await.unwrap(), GenerationOutcome::Applied);
        assert!(ctl.draft().code.contains("Space shooter with aliens"));
        assert_eq!(ctl.draft().name, "Space shooter with aliens");
        assert!(!ctl.is_generating());
    }

    #[tokio::test]
    async fn empty_prompt_creates_nothing() {
        let mut ctl = controller();
        assert!(matches!(
            ctl.generate().await,
            Err(LifecycleError::Validation(_))
        ));
        assert!(ctl.draft().code.is_empty());
        assert!(ctl.list().is_empty());
    }

    #[test]
    fn only_one_generation_at_a_time() {
        let mut ctl = controller();
        ctl.set_prompt("Snake");
        let _ticket = ctl.begin_generation().unwrap();
        assert!(ctl.is_generating());
        assert!(matches!(
            ctl.begin_generation(),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn late_response_does_not_overwrite_newer_draft() {
        let mut ctl = controller();
        ctl.set_prompt("First idea");
        let first = ctl.begin_generation().unwrap();
        ctl.cancel_generation();

        ctl.set_prompt("Second idea");
        let second = ctl.begin_generation().unwrap();
        assert_eq!(
            ctl.finish_generation(&second, Ok("second code".to_string()))
                .unwrap(),
            GenerationOutcome::Applied
        );
        assert_eq!(
            ctl.finish_generation(&first, Ok("first code".to_string()))
                .unwrap(),
            GenerationOutcome::Stale
        );
        assert_eq!(ctl.draft().code, "second code");
        assert_eq!(ctl.draft().prompt, "Second idea");
    }

    #[test]
    fn failed_generation_leaves_draft_unchanged() {
        let mut ctl = controller();
        ctl.set_prompt("Maze");
        ctl.set_name("Maze");
        let ticket = ctl.begin_generation().unwrap();
        ctl.finish_generation(&ticket, Ok("old code".to_string()))
            .unwrap();
        let before = ctl.draft().clone();

        let ticket = ctl.begin_generation().unwrap();
        let result = ctl.finish_generation(
            &ticket,
            Err(LifecycleError::Network("Failed to generate game".to_string())),
        );
        assert!(matches!(result, Err(LifecycleError::Network(_))));
        assert_eq!(ctl.draft(), &before);
        assert!(!ctl.is_generating());
    }

    #[test]
    fn save_checks_name_before_code() {
        let mut ctl = controller();
        assert_eq!(
            ctl.save(),
            Err(LifecycleError::Validation("Please enter a game title".to_string()))
        );
        ctl.set_name("Named");
        assert_eq!(
            ctl.save(),
            Err(LifecycleError::Validation("No game code to save".to_string()))
        );
    }

    #[tokio::test]
    async fn load_overwrites_draft_wholesale() {
        let mut ctl = controller();
        ctl.set_prompt("Breakout clone");
        ctl.generate().await.unwrap();
        ctl.set_name("Breakout");
        let saved = ctl.save().unwrap();

        ctl.set_prompt("Something else");
        ctl.set_name("");
        ctl.load(&saved.id).unwrap();
        assert_eq!(ctl.draft(), &saved.to_draft());
        assert!(matches!(
            ctl.load("missing"),
            Err(LifecycleError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn save_over_updates_in_place() {
        let mut ctl = controller();
        ctl.set_prompt("Pong");
        ctl.generate().await.unwrap();
        let saved = ctl.save().unwrap();
        ctl.set_name("Pong Deluxe");
        let updated = ctl.save_over(&saved.id).unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(ctl.list().len(), 1);
        assert_eq!(ctl.list()[0].name, "Pong Deluxe");
    }

    #[tokio::test]
    async fn export_uses_draft_name() {
        let mut ctl = controller();
        assert!(matches!(ctl.export(), Err(LifecycleError::Validation(_))));
        ctl.set_prompt("Space shooter with aliens");
        ctl.generate().await.unwrap();
        ctl.set_name("My Game!");
        let artifact = ctl.export().unwrap();
        assert_eq!(artifact.file_name, "MyGame.py");
        assert_eq!(artifact.contents, ctl.draft().code);
    }

    #[tokio::test]
    async fn preview_requires_code_and_stops_on_discard() {
        let mut ctl = controller();
        let mut canvas = Canvas::new(800, 600);
        assert!(matches!(
            ctl.start_preview(&canvas),
            Err(LifecycleError::Validation(_))
        ));

        ctl.set_prompt("Dodge the meteors");
        ctl.generate().await.unwrap();
        ctl.start_preview(&canvas).unwrap();
        assert_eq!(ctl.preview().step(&mut canvas), FrameOutcome::Continue);

        ctl.discard_draft();
        assert_eq!(ctl.preview().state(), PreviewState::Stopped);
        assert_eq!(ctl.draft(), &Draft::default());
        assert_eq!(ctl.preview().step(&mut canvas), FrameOutcome::Halted);
    }
}
