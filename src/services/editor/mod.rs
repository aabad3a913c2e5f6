//! Orchestrates one schedule grid: input events drive the range selector,
//! commits are pushed through the sync gateway, and every visible change is
//! handed to the render sink as a fresh [`RenderFrame`].
//!
//! All work happens on one thread. Fetches and pushes run as local tasks
//! (`tokio::task::spawn_local`), so the editor must be driven from inside a
//! `tokio::task::LocalSet`. A task holds only a weak reference to the
//! editor state plus the session it was started under; when it resumes
//! after a detach, a re-attach or a drop, its result is discarded.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tokio::task::JoinHandle;

use crate::models::entity_binding::EntityBinding;
use crate::models::mode::{ModeId, ModeTable};
use crate::models::schedule::{ScheduleError, ScheduleMatrix, SlotCoord};
use crate::models::settings::{ConfigError, ScheduleConfig};
use crate::services::notice::Notice;
use crate::services::selection::{ClickOutcome, RangeSelector};
use crate::services::sync::{LoadedSchedule, RemoteHandle, SyncGateway};

/// Where the editor sends frames and notices.
#[cfg_attr(test, mockall::automock)]
pub trait RenderSink {
    fn render(&self, frame: &RenderFrame);
    fn notify(&self, notice: &Notice);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCell {
    pub mode: ModeId,
    pub is_pending: bool,
}

/// Read-only snapshot of everything the shell draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFrame {
    pub schedule_id: String,
    pub title: String,
    /// Seven rows of 48 cells, showing the effective mode of each slot.
    pub grid: Vec<Vec<RenderCell>>,
    pub entities: Vec<String>,
    pub current_mode: ModeId,
    pub anchor: Option<SlotCoord>,
}

impl RenderFrame {
    /// Mode shown in each cell. Matches the committed grid when nothing is
    /// pending.
    pub fn committed_modes(&self) -> Vec<Vec<ModeId>> {
        self.grid
            .iter()
            .map(|row| row.iter().map(|cell| cell.mode.clone()).collect())
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.grid.iter().flatten().filter(|cell| cell.is_pending).count()
    }
}

struct EditorState {
    session: u64,
    config: Option<ScheduleConfig>,
    /// `None` until the first fetch for the current session resolves.
    matrix: Option<ScheduleMatrix>,
    entities: EntityBinding,
    selector: RangeSelector,
    current_mode: ModeId,
    tasks: Vec<JoinHandle<()>>,
}

impl EditorState {
    fn install(&mut self, loaded: LoadedSchedule) {
        self.matrix = Some(loaded.matrix);
        self.entities = loaded.entities;
        self.selector.reset();
    }

    fn frame(&self) -> Option<RenderFrame> {
        let config = self.config.as_ref()?;
        let matrix = self.matrix.as_ref()?;
        Some(RenderFrame {
            schedule_id: config.id.clone(),
            title: config.title.clone(),
            grid: matrix
                .rows()
                .map(|row| {
                    row.iter()
                        .map(|slot| RenderCell {
                            mode: slot.effective().clone(),
                            is_pending: slot.is_pending(),
                        })
                        .collect()
                })
                .collect(),
            entities: self.entities.to_vec(),
            current_mode: self.current_mode.clone(),
            anchor: self.selector.anchor(),
        })
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(handle);
    }
}

pub struct GridEditor<R, S> {
    state: Rc<RefCell<EditorState>>,
    gateway: SyncGateway<R>,
    sink: Rc<S>,
}

impl<R, S> GridEditor<R, S>
where
    R: RemoteHandle + 'static,
    S: RenderSink + 'static,
{
    pub fn new(
        remote: Rc<R>,
        sink: Rc<S>,
        modes: ModeTable,
        initial_mode: &str,
    ) -> Result<Self, ScheduleError> {
        let current_mode = modes.resolve(initial_mode)?;
        let state = EditorState {
            session: 0,
            config: None,
            matrix: None,
            entities: EntityBinding::new(),
            selector: RangeSelector::new(),
            current_mode,
            tasks: Vec::new(),
        };

        Ok(Self {
            state: Rc::new(RefCell::new(state)),
            gateway: SyncGateway::new(remote, Rc::new(modes)),
            sink,
        })
    }

    /// Bind the editor to a schedule and start loading it.
    pub fn on_attach(&self, config: ScheduleConfig) -> Result<(), ConfigError> {
        config.validate()?;
        log::info!("Attaching editor to schedule '{}'", config.id);

        let schedule_id = config.id.clone();
        let session = {
            let mut state = self.state.borrow_mut();
            state.session += 1;
            state.config = Some(config);
            state.matrix = None;
            state.entities = EntityBinding::new();
            state.selector.reset();
            state.session
        };

        self.spawn_load(session, schedule_id);
        Ok(())
    }

    /// Drop the current schedule. In-flight tasks finish but their results
    /// are discarded.
    pub fn on_detach(&self) {
        let mut state = self.state.borrow_mut();
        if let Some(config) = state.config.take() {
            log::info!("Detaching editor from schedule '{}'", config.id);
        }
        state.session += 1;
        state.matrix = None;
        state.entities = EntityBinding::new();
        state.selector.reset();
    }

    pub fn on_cell_click(&self, day: usize, half_hour: usize) -> Result<(), ScheduleError> {
        let cell = SlotCoord::new(day, half_hour)?;

        let outcome = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let Some(matrix) = state.matrix.as_mut() else {
                log::debug!("Ignoring click before schedule is loaded");
                return Ok(());
            };
            state.selector.click(matrix, cell, &state.current_mode)
        };

        self.render();
        if let ClickOutcome::Committed { .. } = outcome {
            self.spawn_push();
        }
        Ok(())
    }

    pub fn on_cell_hover(&self, day: usize, half_hour: usize) -> Result<(), ScheduleError> {
        let cell = SlotCoord::new(day, half_hour)?;

        let previewed = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            match state.matrix.as_mut() {
                Some(matrix) => state
                    .selector
                    .hover(matrix, cell, &state.current_mode)
                    .is_some(),
                None => false,
            }
        };

        if previewed {
            self.render();
        }
        Ok(())
    }

    /// Abort the gesture in progress, if any.
    pub fn on_cancel(&self) -> bool {
        let cancelled = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            match state.matrix.as_mut() {
                Some(matrix) => state.selector.cancel(matrix),
                None => false,
            }
        };

        if cancelled {
            self.render();
        }
        cancelled
    }

    pub fn on_mode_selected(&self, mode_id: &str) -> Result<(), ScheduleError> {
        let mode = self.gateway.modes().resolve(mode_id)?;
        self.state.borrow_mut().current_mode = mode;
        self.render();
        Ok(())
    }

    /// Replace the bound devices and push them with the unchanged grid.
    pub fn set_entities<I, T>(&self, entity_ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        {
            let mut state = self.state.borrow_mut();
            if state.matrix.is_none() {
                log::debug!("Ignoring entity change before schedule is loaded");
                return;
            }
            state.entities = entity_ids.into_iter().collect();
        }

        self.render();
        self.spawn_push();
    }

    pub fn render_frame(&self) -> Option<RenderFrame> {
        self.state.borrow().frame()
    }

    pub fn current_mode(&self) -> ModeId {
        self.state.borrow().current_mode.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.borrow().matrix.is_some()
    }

    /// Wait until every fetch and push started so far has completed.
    pub async fn settle(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = self.state.borrow_mut().tasks.drain(..).collect();
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                if let Err(err) = handle.await {
                    log::error!("Sync task failed: {}", err);
                }
            }
        }
    }

    fn render(&self) {
        if let Some(frame) = self.render_frame() {
            self.sink.render(&frame);
        }
    }

    fn spawn_load(&self, session: u64, schedule_id: String) {
        let weak = Rc::downgrade(&self.state);
        let gateway = self.gateway.clone();
        let sink = Rc::clone(&self.sink);

        let handle = tokio::task::spawn_local(async move {
            let result = gateway.fetch_or_default(&schedule_id).await;
            let Some(state) = live(&weak, session) else {
                log::debug!("Discarding fetch of '{}' for a stale session", schedule_id);
                return;
            };

            match result {
                Ok(loaded) => {
                    state.borrow_mut().install(loaded);
                    render_state(&state, &*sink);
                }
                Err(err) => {
                    log::error!("Could not load schedule '{}': {}", schedule_id, err);
                    sink.notify(&Notice::error(format!(
                        "Could not load schedule '{}': {}",
                        schedule_id, err
                    )));
                }
            }
        });

        self.state.borrow_mut().track(handle);
    }

    fn spawn_push(&self) {
        let (session, schedule_id, matrix, entities) = {
            let state = self.state.borrow();
            let (Some(config), Some(matrix)) = (state.config.as_ref(), state.matrix.as_ref()) else {
                return;
            };
            // An open gesture is not persisted yet.
            (
                state.session,
                config.id.clone(),
                state.selector.settled_view(matrix),
                state.entities.clone(),
            )
        };

        let weak = Rc::downgrade(&self.state);
        let gateway = self.gateway.clone();
        let sink = Rc::clone(&self.sink);

        let handle = tokio::task::spawn_local(async move {
            let Err(err) = gateway.push(&schedule_id, &matrix, &entities).await else {
                return;
            };

            log::warn!("Push of schedule '{}' failed: {}", schedule_id, err);
            if live(&weak, session).is_none() {
                return;
            }
            sink.notify(&Notice::warning(format!(
                "Could not save schedule '{}': {}. Reloading.",
                schedule_id, err
            )));

            // Reconcile with whatever the remote now holds.
            let result = gateway.fetch_or_default(&schedule_id).await;
            let Some(state) = live(&weak, session) else {
                return;
            };
            match result {
                Ok(loaded) => {
                    state.borrow_mut().install(loaded);
                    render_state(&state, &*sink);
                }
                Err(err) => {
                    log::error!("Could not reload schedule '{}': {}", schedule_id, err);
                    sink.notify(&Notice::error(format!(
                        "Could not reload schedule '{}': {}",
                        schedule_id, err
                    )));
                }
            }
        });

        self.state.borrow_mut().track(handle);
    }
}

fn live(weak: &Weak<RefCell<EditorState>>, session: u64) -> Option<Rc<RefCell<EditorState>>> {
    let state = weak.upgrade()?;
    if state.borrow().session != session {
        return None;
    }
    Some(state)
}

fn render_state<S: RenderSink + ?Sized>(state: &RefCell<EditorState>, sink: &S) {
    let frame = state.borrow().frame();
    if let Some(frame) = frame {
        sink.render(&frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schedule::{DAYS_PER_WEEK, HALF_HOURS_PER_DAY};
    use crate::services::sync::wire::{ModeEntry, ScheduleRecord};
    use crate::services::sync::{SqliteScheduleStore, SyncError};
    use mockall::predicate::function;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use tokio::task::LocalSet;

    /// Local store whose updates can be made to fail.
    struct FlakyStore {
        inner: SqliteScheduleStore,
        fail_updates: Cell<bool>,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: SqliteScheduleStore::in_memory().unwrap(),
                fail_updates: Cell::new(false),
            }
        }
    }

    impl RemoteHandle for FlakyStore {
        async fn schedule_fetch(&self, schedule_id: &str) -> Result<ScheduleRecord, SyncError> {
            self.inner.schedule_fetch(schedule_id).await
        }

        async fn schedule_update(
            &self,
            schedule_id: &str,
            record: &ScheduleRecord,
        ) -> Result<(), SyncError> {
            if self.fail_updates.get() {
                return Err(SyncError::Rejected("read-only".to_string()));
            }
            self.inner.schedule_update(schedule_id, record).await
        }
    }

    fn quiet_sink() -> MockRenderSink {
        let mut sink = MockRenderSink::new();
        sink.expect_render().returning(|_| ());
        sink.expect_notify().never();
        sink
    }

    fn editor(
        store: Rc<FlakyStore>,
        sink: MockRenderSink,
    ) -> GridEditor<FlakyStore, MockRenderSink> {
        GridEditor::new(store, Rc::new(sink), ModeTable::default(), "comfort").unwrap()
    }

    fn config() -> ScheduleConfig {
        ScheduleConfig::new("living", "Living room")
    }

    fn stored(store: &FlakyStore) -> ScheduleRecord {
        store.inner.load("living").unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_input_before_load_is_ignored() {
        LocalSet::new()
            .run_until(async {
                let mut sink = MockRenderSink::new();
                sink.expect_render().never();
                sink.expect_notify().never();
                let editor = editor(Rc::new(FlakyStore::new()), sink);

                editor.on_attach(config()).unwrap();
                editor.on_cell_click(0, 0).unwrap();
                editor.on_cell_hover(1, 1).unwrap();

                assert!(editor.render_frame().is_none());
                assert!(!editor.is_loaded());
            })
            .await;
    }

    #[tokio::test]
    async fn test_first_load_uses_default_schedule() {
        LocalSet::new()
            .run_until(async {
                let mut sink = MockRenderSink::new();
                sink.expect_render()
                    .with(function(|frame: &RenderFrame| frame.title == "Living room"))
                    .times(1)
                    .returning(|_| ());
                sink.expect_notify().never();
                let editor = editor(Rc::new(FlakyStore::new()), sink);

                editor.on_attach(config()).unwrap();
                editor.settle().await;

                let frame = editor.render_frame().unwrap();
                assert!(frame.grid.iter().flatten().all(|cell| cell.mode.as_str() == "eco"));
                assert_eq!(frame.current_mode.as_str(), "comfort");
                assert!(frame.entities.is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_out_of_range_input_is_an_error() {
        LocalSet::new()
            .run_until(async {
                let editor = editor(Rc::new(FlakyStore::new()), quiet_sink());
                editor.on_attach(config()).unwrap();
                editor.settle().await;
                let before = editor.render_frame();

                assert_eq!(
                    editor.on_cell_click(7, 0),
                    Err(ScheduleError::OutOfRange { day: 7, half_hour: 0 })
                );
                assert!(editor.on_cell_hover(0, 48).is_err());
                assert_eq!(editor.render_frame(), before);
            })
            .await;
    }

    #[tokio::test]
    async fn test_commit_pushes_full_snapshot() {
        LocalSet::new()
            .run_until(async {
                let store = Rc::new(FlakyStore::new());
                let editor = editor(Rc::clone(&store), quiet_sink());
                editor.on_attach(config()).unwrap();
                editor.settle().await;

                editor.on_cell_click(0, 0).unwrap();
                editor.on_cell_hover(2, 3).unwrap();
                editor.on_cell_click(2, 3).unwrap();
                editor.settle().await;

                let record = stored(&store);
                let comfort = record
                    .schedule
                    .iter()
                    .flatten()
                    .filter(|entry| entry.committed.as_str() == "comfort")
                    .count();
                assert_eq!(comfort, 12);
                assert_eq!(editor.render_frame().unwrap().pending_count(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_mode_selection() {
        LocalSet::new()
            .run_until(async {
                let editor = editor(Rc::new(FlakyStore::new()), quiet_sink());
                editor.on_attach(config()).unwrap();
                editor.settle().await;

                editor.on_mode_selected("away").unwrap();
                assert_eq!(editor.current_mode().as_str(), "away");
                assert!(matches!(
                    editor.on_mode_selected("turbo"),
                    Err(ScheduleError::UnknownMode(_))
                ));
                assert_eq!(editor.current_mode().as_str(), "away");
            })
            .await;
    }

    #[tokio::test]
    async fn test_push_failure_warns_and_reloads_remote() {
        LocalSet::new()
            .run_until(async {
                let store = Rc::new(FlakyStore::new());
                let remote = ScheduleRecord {
                    schedule: vec![
                        vec![ModeEntry::new(ModeId::from("away")); HALF_HOURS_PER_DAY];
                        DAYS_PER_WEEK
                    ],
                    entities: vec!["climate.salon".to_string()],
                };
                store.inner.save("living", &remote).unwrap();

                let mut sink = MockRenderSink::new();
                sink.expect_render().returning(|_| ());
                sink.expect_notify()
                    .with(function(|notice: &Notice| {
                        notice.level == crate::services::notice::NoticeLevel::Warning
                    }))
                    .times(1)
                    .returning(|_| ());
                let editor = editor(Rc::clone(&store), sink);
                editor.on_attach(config()).unwrap();
                editor.settle().await;

                store.fail_updates.set(true);
                editor.on_cell_click(3, 3).unwrap();
                editor.on_cell_click(3, 3).unwrap();
                editor.settle().await;

                let frame = editor.render_frame().unwrap();
                assert_eq!(
                    frame.committed_modes(),
                    vec![vec![ModeId::from("away"); HALF_HOURS_PER_DAY]; DAYS_PER_WEEK]
                );
                assert_eq!(frame.entities, vec!["climate.salon"]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_detach_discards_late_results() {
        LocalSet::new()
            .run_until(async {
                let editor = editor(Rc::new(FlakyStore::new()), quiet_sink());
                editor.on_attach(config()).unwrap();
                editor.on_detach();
                editor.settle().await;

                assert!(!editor.is_loaded());
                assert!(editor.render_frame().is_none());
            })
            .await;
    }

    #[tokio::test]
    async fn test_set_entities_pushes_unchanged_grid() {
        LocalSet::new()
            .run_until(async {
                let store = Rc::new(FlakyStore::new());
                let editor = editor(Rc::clone(&store), quiet_sink());
                editor.on_attach(config()).unwrap();
                editor.settle().await;

                editor.set_entities(["climate.a", "climate.b", "climate.a"]);
                editor.settle().await;

                let record = stored(&store);
                assert_eq!(record.entities, vec!["climate.a", "climate.b"]);
                assert!(record
                    .schedule
                    .iter()
                    .flatten()
                    .all(|entry| entry.committed.as_str() == "eco"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_entity_push_during_gesture_leaves_anchor_unpersisted() {
        LocalSet::new()
            .run_until(async {
                let store = Rc::new(FlakyStore::new());
                let editor = editor(Rc::clone(&store), quiet_sink());
                editor.on_attach(config()).unwrap();
                editor.settle().await;

                editor.on_cell_click(2, 2).unwrap();
                editor.set_entities(["climate.a"]);
                editor.settle().await;

                let record = stored(&store);
                assert_eq!(record.entities, vec!["climate.a"]);
                assert_eq!(record.schedule[2][2].committed.as_str(), "eco");

                assert!(editor.on_cancel());
                editor.settle().await;

                let frame = editor.render_frame().unwrap();
                assert_eq!(frame.committed_modes()[2][2], ModeId::from("eco"));
                assert_eq!(stored(&store).schedule[2][2].committed.as_str(), "eco");
            })
            .await;
    }

    #[tokio::test]
    async fn test_commit_after_entity_push_persists_anchor() {
        LocalSet::new()
            .run_until(async {
                let store = Rc::new(FlakyStore::new());
                let editor = editor(Rc::clone(&store), quiet_sink());
                editor.on_attach(config()).unwrap();
                editor.settle().await;

                editor.on_cell_click(2, 2).unwrap();
                editor.set_entities(["climate.a"]);
                editor.on_cell_click(2, 2).unwrap();
                editor.settle().await;

                let record = stored(&store);
                assert_eq!(record.schedule[2][2].committed.as_str(), "comfort");
                assert_eq!(record.entities, vec!["climate.a"]);
            })
            .await;
    }
}
