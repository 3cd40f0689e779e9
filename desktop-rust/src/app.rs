use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use anyhow::Result;
use eframe::egui::text::LayoutJob;
use eframe::egui::{self, Color32, RichText, TextFormat};
use eframe::egui::{FontData, FontDefinitions, FontFamily};
use tracing::{debug, warn};

use answer_review_common::highlight::Segment;
use answer_review_common::workflow::{EvaluationWorkflow, Key, Navigation, WorkflowOptions};
use answer_review_common::{
    Config, Error, EvaluationStore, Factuality, IdentityProvider, JsonFileStorage, Notice,
    NoticeLevel, Relevance, Screen, Shell, ShellEvent, SourceFormat,
};

use crate::io::{export_items, load_project, suggested_name};
use crate::model::{Action, UiMessage, UploadForm};

pub struct DesktopApp {
    config: Config,
    config_path: PathBuf,
    store: EvaluationStore<JsonFileStorage>,
    workflow: EvaluationWorkflow,
    shell: Shell,
    form: UploadForm,
    reviewer_input: String,
    status: Option<Notice>,
    worker_rx: Option<Receiver<UiMessage>>,
    busy: bool,
}

impl DesktopApp {
    /// 設定の保存先・スロットを解決して起動
    pub fn open(config: Config) -> Result<Self> {
        let storage = config.storage()?;
        let config_path = Config::config_path()?;
        Ok(Self::with_storage(config, config_path, storage))
    }

    fn with_storage(config: Config, config_path: PathBuf, storage: JsonFileStorage) -> Self {
        let mut store = EvaluationStore::new(storage);
        let status = store.restore();
        let shell = Shell::mount(store.has_project());
        let workflow = EvaluationWorkflow::attach(
            &mut store,
            WorkflowOptions {
                highlight: config.highlight_matches,
            },
        );
        let reviewer_input = config.reviewer.clone().unwrap_or_default();

        Self {
            config,
            config_path,
            store,
            workflow,
            shell,
            form: UploadForm::default(),
            reviewer_input,
            status,
            worker_rx: None,
            busy: false,
        }
    }

    fn save_config(&mut self) {
        if let Err(err) = self.config.save_to(&self.config_path) {
            self.status = Some(Notice::error("Settings not saved", err.to_string()));
        }
    }

    fn apply(&mut self, action: Action) {
        debug!(?action, "ui action");
        match action {
            Action::SignIn => match self.config.sign_in(&self.reviewer_input) {
                Ok(()) => {
                    self.status = None;
                    self.save_config();
                }
                Err(err) => self.status = Some(Notice::error("Sign in failed", err.to_string())),
            },
            Action::SignOut => {
                self.config.sign_out();
                self.save_config();
            }
            Action::PickFile => {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Spreadsheet", &["xlsx", "csv"])
                    .pick_file()
                {
                    self.select_file(path);
                }
            }
            Action::DropFile(path) => self.select_file(path),
            Action::Upload => self.start_import(),
            Action::SetAgreement(value) => {
                let result = self.workflow.set_agreement(&mut self.store, value);
                self.show_saved(result);
            }
            Action::SetRelevance(value) => {
                let result = self.workflow.set_relevance(&mut self.store, value);
                self.show_saved(result);
            }
            Action::SetFactuality(value) => {
                let result = self.workflow.set_factuality(&mut self.store, value);
                self.show_saved(result);
            }
            Action::SetHighlight(on) => {
                self.workflow.set_highlight(on);
                self.config.highlight_matches = on;
                self.save_config();
            }
            Action::Key { key, in_text_input } => {
                let result = self.workflow.handle_key(&mut self.store, key, in_text_input);
                match result {
                    Ok(Some(nav)) => self.on_navigation(nav),
                    Ok(None) => {}
                    Err(err) => self.status = Some(Notice::error("Navigation failed", err.to_string())),
                }
            }
            Action::Next => {
                let result = self.workflow.next(&mut self.store);
                self.navigation_result(result);
            }
            Action::Previous => {
                let result = self.workflow.prev(&mut self.store);
                self.navigation_result(result);
            }
            Action::ShowResults => {
                self.shell.apply(ShellEvent::ShowResults);
            }
            Action::Export => {
                if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                    self.start_export(dir);
                }
            }
            Action::ExportTo(dir) => self.start_export(dir),
            Action::Reset => match self.store.reset_project() {
                Ok(()) => {
                    self.workflow.sync(&self.store);
                    self.shell.apply(ShellEvent::Reset);
                    self.form = UploadForm::default();
                    self.status = None;
                }
                Err(err) => self.status = Some(Notice::error("Reset failed", err.to_string())),
            },
        }
    }

    fn show_saved(&mut self, result: answer_review_common::Result<Notice>) {
        self.status = Some(match result {
            Ok(notice) => notice,
            Err(err) => Notice::error("Evaluation not saved", err.to_string()),
        });
    }

    fn navigation_result(&mut self, result: answer_review_common::Result<Navigation>) {
        match result {
            Ok(nav) => self.on_navigation(nav),
            Err(err) => self.status = Some(Notice::error("Navigation failed", err.to_string())),
        }
    }

    fn on_navigation(&mut self, nav: Navigation) {
        match nav {
            Navigation::Blocked(notice) => self.status = Some(notice),
            Navigation::Finished => {
                self.shell.apply(ShellEvent::AdvancedPastEnd);
            }
            Navigation::Moved { .. } | Navigation::Unchanged => {}
        }
    }

    fn select_file(&mut self, path: PathBuf) {
        if let Err(err) = SourceFormat::from_path(&path) {
            self.status = Some(Notice::upload_failed(&err));
            return;
        }
        if self.form.name.trim().is_empty() {
            self.form.name = suggested_name(&path);
        }
        self.form.path = Some(path);
        self.status = None;
    }

    fn start_import(&mut self) {
        if self.busy {
            return;
        }
        let Some(path) = self.form.path.clone() else {
            self.status = Some(Notice::error("No file selected", "Please select a file to upload."));
            return;
        };
        let name = self.form.name.trim().to_string();
        if name.is_empty() {
            self.status = Some(Notice::upload_failed(&Error::ProjectNameRequired));
            return;
        }

        let (tx, rx) = mpsc::channel();
        self.worker_rx = Some(rx);
        self.busy = true;
        self.status = Some(Notice::info("Processing...", path.display().to_string()));

        std::thread::spawn(move || {
            let _ = tx.send(UiMessage::ImportDone(load_project(&path, &name)));
        });
    }

    fn start_export(&mut self, dir: PathBuf) {
        if self.busy {
            return;
        }
        let Some(project) = self.store.project() else {
            return;
        };
        let items = self.store.all_items().to_vec();
        let name = project.name.clone();

        let (tx, rx) = mpsc::channel();
        self.worker_rx = Some(rx);
        self.busy = true;

        std::thread::spawn(move || {
            let _ = tx.send(UiMessage::ExportDone(export_items(&items, &name, &dir)));
        });
    }

    fn poll_messages(&mut self) {
        let Some(rx) = &self.worker_rx else {
            return;
        };
        let msg = match rx.try_recv() {
            Ok(msg) => msg,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                warn!("worker thread ended without a result");
                self.worker_rx = None;
                self.busy = false;
                self.status = Some(Notice::error("Upload failed", "The background task stopped unexpectedly."));
                return;
            }
        };
        self.worker_rx = None;
        self.busy = false;

        match msg {
            UiMessage::ImportDone(Ok(project)) => {
                let count = project.total();
                match self.store.set_project(project) {
                    Ok(()) => {
                        self.workflow.sync(&self.store);
                        self.shell.apply(ShellEvent::FileProcessed);
                        self.form = UploadForm::default();
                        self.status = Some(Notice::uploaded(count));
                    }
                    Err(err) => self.status = Some(Notice::upload_failed(&err)),
                }
            }
            UiMessage::ImportDone(Err(err)) => {
                self.status = Some(match err.downcast_ref::<Error>() {
                    Some(e) => Notice::upload_failed(e),
                    None => Notice::error("Upload failed", format!("{err:#}")),
                });
            }
            UiMessage::ExportDone(Ok(path)) => {
                self.status = Some(Notice::success("Export complete", path.display().to_string()));
            }
            UiMessage::ExportDone(Err(err)) => {
                self.status = Some(Notice::error("Export failed", format!("{err:#}")));
            }
        }
    }

    fn render_landing(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading("Answer Review");
            ui.label("Sign in to start evaluating answers.");
            ui.add_space(12.0);
            ui.horizontal(|ui| {
                ui.label("Reviewer");
                let response = ui.text_edit_singleline(&mut self.reviewer_input);
                let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Sign in").clicked() || submitted {
                    actions.push(Action::SignIn);
                }
            });
        });
    }

    fn render_upload(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        ui.heading("Upload");
        ui.label("Drop an Excel (.xlsx) or CSV (.csv) file here, or choose one.");
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            if ui.add_enabled(!self.busy, egui::Button::new("Choose File...")).clicked() {
                actions.push(Action::PickFile);
            }
            let selected = self
                .form
                .path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "No file selected".to_string());
            ui.label(RichText::new(selected).color(Color32::from_gray(170)));
        });

        ui.horizontal(|ui| {
            ui.label("Project name");
            ui.text_edit_singleline(&mut self.form.name);
        });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.add_enabled(!self.busy, egui::Button::new("Upload")).clicked() {
                actions.push(Action::Upload);
            }
            if self.busy {
                ui.spinner();
                ui.label("Processing...");
            }
        });
    }

    fn render_evaluate(&self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let Some(project) = self.store.project() else {
            ui.label("No project loaded.");
            return;
        };
        let Some(item) = self.workflow.item() else {
            ui.label("No item selected.");
            return;
        };

        let progress = self.store.progress();
        ui.add(
            egui::ProgressBar::new(f32::from(progress) / 100.0).text(format!(
                "{} of {} evaluated ({}%)",
                self.store.completed(),
                self.store.total(),
                progress
            )),
        );
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            ui.heading(format!("Item {} of {}", project.current_index + 1, project.total()));
            let color = if self.workflow.is_complete() {
                Color32::from_rgb(96, 186, 120)
            } else {
                Color32::from_rgb(246, 196, 69)
            };
            ui.label(RichText::new(self.workflow.badge()).color(color).strong());
            ui.label(RichText::new(format!("Id: {}", item.id)).color(Color32::from_gray(170)));
        });
        ui.separator();

        ui.label(RichText::new("Question").strong());
        ui.label(&item.question);
        ui.add_space(6.0);

        let mut highlight = self.workflow.options().highlight;
        if ui.checkbox(&mut highlight, "Highlight matching words").changed() {
            actions.push(Action::SetHighlight(highlight));
        }

        if let Some(answers) = self.workflow.highlighted_answers() {
            ui.columns(2, |cols| {
                cols[0].label(RichText::new("Answer").strong());
                let job = answer_job(&answers.answer, &cols[0]);
                cols[0].label(job);
                cols[1].label(RichText::new("LLM Answer").strong());
                let job = answer_job(&answers.answer_llm, &cols[1]);
                cols[1].label(job);
            });
        }
        ui.separator();

        egui::Grid::new("judgments").num_columns(2).spacing([16.0, 8.0]).show(ui, |ui| {
            ui.label("Agriculture consensus");
            ui.horizontal(|ui| {
                for (value, label) in [(true, "Yes"), (false, "No")] {
                    if ui.radio(item.agriculture_consensus() == Some(value), label).clicked() {
                        actions.push(Action::SetAgreement(value));
                    }
                }
            });
            ui.end_row();

            ui.label("Relevance");
            ui.vertical(|ui| {
                for relevance in Relevance::ALL {
                    if ui.radio(item.relevance() == Some(relevance), relevance.label()).clicked() {
                        actions.push(Action::SetRelevance(relevance));
                    }
                }
            });
            ui.end_row();

            ui.label("Factuality");
            ui.horizontal(|ui| {
                for factuality in Factuality::ALL {
                    if ui.radio(item.factuality() == Some(factuality), factuality.label()).clicked() {
                        actions.push(Action::SetFactuality(factuality));
                    }
                }
            });
            ui.end_row();
        });

        ui.add_space(10.0);
        ui.horizontal(|ui| {
            if ui.add_enabled(project.current_index > 0, egui::Button::new("← Previous")).clicked() {
                actions.push(Action::Previous);
            }
            let next_label = if project.is_last() { "Finish" } else { "Next →" };
            if ui.button(next_label).clicked() {
                actions.push(Action::Next);
            }
            ui.separator();
            if ui.add_enabled(!self.busy, egui::Button::new("Save")).clicked() {
                actions.push(Action::Export);
            }
            if ui.button("View Results").clicked() {
                actions.push(Action::ShowResults);
            }
            if self.busy {
                ui.spinner();
            }
        });
    }

    fn render_export(&self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let Some(project) = self.store.project() else {
            ui.label("No project loaded.");
            if ui.button("Start New Project").clicked() {
                actions.push(Action::Reset);
            }
            return;
        };

        ui.heading(format!("Project Summary: {}", project.name));
        ui.add_space(6.0);
        let progress = project.progress();
        ui.add(egui::ProgressBar::new(f32::from(progress) / 100.0).text(format!(
            "{} of {} items ({}%)",
            project.completed(),
            project.total(),
            progress
        )));
        ui.add_space(6.0);

        egui::Grid::new("summary").striped(true).num_columns(2).show(ui, |ui| {
            ui.label(RichText::new("Project Name").color(Color32::from_gray(170)));
            ui.label(&project.name);
            ui.end_row();
            ui.label(RichText::new("Last Updated").color(Color32::from_gray(170)));
            ui.label(project.last_updated.format("%Y-%m-%d %H:%M:%S UTC").to_string());
            ui.end_row();
            ui.label(RichText::new("Total Items").color(Color32::from_gray(170)));
            ui.label(project.total().to_string());
            ui.end_row();
            ui.label(RichText::new("Completed").color(Color32::from_gray(170)));
            ui.label(project.completed().to_string());
            ui.end_row();
        });

        ui.add_space(10.0);
        ui.horizontal(|ui| {
            if ui.add_enabled(!self.busy, egui::Button::new("Export Results to Excel")).clicked() {
                actions.push(Action::Export);
            }
            if ui.button("Start New Project").clicked() {
                actions.push(Action::Reset);
            }
            if self.busy {
                ui.spinner();
            }
        });
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        let Some(notice) = &self.status else {
            ui.label("");
            return;
        };
        let color = match notice.level {
            NoticeLevel::Success => Color32::from_rgb(96, 186, 120),
            NoticeLevel::Info => Color32::from_gray(170),
            NoticeLevel::Warning => Color32::from_rgb(246, 196, 69),
            NoticeLevel::Error => Color32::from_rgb(230, 90, 90),
        };
        ui.horizontal(|ui| {
            ui.label(RichText::new(&notice.title).color(color).strong());
            ui.label(RichText::new(&notice.description).color(Color32::from_gray(200)));
        });
    }
}

fn answer_job(segments: &[Segment<'_>], ui: &egui::Ui) -> LayoutJob {
    let mut job = LayoutJob::default();
    job.wrap.max_width = ui.available_width();
    let plain = TextFormat {
        color: ui.visuals().text_color(),
        ..Default::default()
    };
    let marked = TextFormat {
        color: Color32::BLACK,
        background: Color32::from_rgb(255, 226, 122),
        ..Default::default()
    };
    for segment in segments {
        let format = if segment.marked { marked.clone() } else { plain.clone() };
        job.append(segment.text, 0.0, format);
    }
    job
}

fn pressed_key(ctx: &egui::Context) -> Option<Key> {
    ctx.input(|i| {
        if i.key_pressed(egui::Key::ArrowRight) {
            Some(Key::ArrowRight)
        } else if i.key_pressed(egui::Key::ArrowLeft) {
            Some(Key::ArrowLeft)
        } else if i.key_pressed(egui::Key::N) {
            Some(Key::Char('n'))
        } else if i.key_pressed(egui::Key::P) {
            Some(Key::Char('p'))
        } else {
            None
        }
    })
}

fn dropped_path(ctx: &egui::Context) -> Option<PathBuf> {
    ctx.input(|i| i.raw.dropped_files.iter().find_map(|f| f.path.clone()))
}

/// 日本語・中国語などの回答を表示するためのフォールバックフォント
pub fn configure_fonts(ctx: &egui::Context) {
    const CANDIDATES: [&str; 5] = [
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        r"C:\Windows\Fonts\meiryo.ttc",
        r"C:\Windows\Fonts\msgothic.ttc",
    ];

    let Some(data) = CANDIDATES.iter().find_map(|p| std::fs::read(Path::new(p)).ok()) else {
        debug!("no fallback font found");
        return;
    };

    let mut fonts = FontDefinitions::default();
    fonts.font_data.insert("answer_fallback".to_string(), FontData::from_owned(data));
    for family in [FontFamily::Proportional, FontFamily::Monospace] {
        fonts.families.entry(family).or_default().push("answer_fallback".to_string());
    }
    ctx.set_fonts(fonts);
}

impl eframe::App for DesktopApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_messages();
        self.workflow.sync(&self.store);
        if self.busy {
            ctx.request_repaint();
        }

        let screen = self.shell.screen(&self.config);
        let mut actions = Vec::new();

        match screen {
            Screen::Upload => {
                if let Some(path) = dropped_path(ctx) {
                    actions.push(Action::DropFile(path));
                }
            }
            Screen::Evaluate => {
                if let Some(key) = pressed_key(ctx) {
                    actions.push(Action::Key {
                        key,
                        in_text_input: ctx.wants_keyboard_input(),
                    });
                }
            }
            Screen::Landing | Screen::Export => {}
        }

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Answer Review");
                if let Some(name) = self.config.display_name() {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Sign out").clicked() {
                            actions.push(Action::SignOut);
                        }
                        ui.label(RichText::new(name).color(Color32::from_gray(200)));
                    });
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.render_status(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| match screen {
                Screen::Landing => self.render_landing(ui, &mut actions),
                Screen::Upload => self.render_upload(ui, &mut actions),
                Screen::Evaluate => self.render_evaluate(ui, &mut actions),
                Screen::Export => self.render_export(ui, &mut actions),
            });
        });

        for action in actions {
            self.apply(action);
        }
    }
}

/// 起動に失敗したときの画面
pub struct StartupError(pub String);

impl eframe::App for StartupError {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Answer Review could not start");
            ui.label(RichText::new(&self.0).color(Color32::from_rgb(230, 90, 90)));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use answer_review_common::{EvaluationItem, EvaluationProject, View};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn test_app(dir: &Path) -> DesktopApp {
        let mut config = Config::default();
        config.sign_in("tester").unwrap();
        DesktopApp::with_storage(config, dir.join("config.json"), JsonFileStorage::in_dir(dir))
    }

    fn wait_for_worker(app: &mut DesktopApp) {
        let start = Instant::now();
        while app.busy && start.elapsed() < Duration::from_secs(5) {
            app.poll_messages();
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!app.busy, "worker did not finish");
    }

    fn load_items(app: &mut DesktopApp, n: usize) {
        let items = (1..=n)
            .map(|i| EvaluationItem::new(i.to_string(), "Q", "A", "L"))
            .collect();
        app.store
            .set_project(EvaluationProject::from_items("demo", items).unwrap())
            .unwrap();
        app.workflow.sync(&app.store);
        app.shell.apply(ShellEvent::FileProcessed);
    }

    #[test]
    fn test_upload_flow() {
        let dir = tempdir().expect("Failed to create temp dir");
        let csv = dir.path().join("soil_qa.csv");
        std::fs::write(&csv, "Id,Questions,Answers,Answer_LLM\n1,Q1,A1,L1\n2,Q2,A2,L2\n").unwrap();

        let mut app = test_app(dir.path());
        app.apply(Action::DropFile(csv));
        assert_eq!(app.form.name, "soil_qa");

        app.apply(Action::Upload);
        assert!(app.busy);
        wait_for_worker(&mut app);

        assert_eq!(app.shell.view(), View::Evaluate);
        assert_eq!(app.store.total(), 2);
        assert_eq!(app.workflow.item().unwrap().id, "1");
        assert_eq!(app.status.as_ref().unwrap().title, "File uploaded successfully");
    }

    #[test]
    fn test_upload_failure_keeps_upload_view() {
        let dir = tempdir().expect("Failed to create temp dir");
        let csv = dir.path().join("bad.csv");
        std::fs::write(&csv, "Id,Questions,Answers\n1,Q,A\n").unwrap();

        let mut app = test_app(dir.path());
        app.apply(Action::DropFile(csv));
        app.apply(Action::Upload);
        wait_for_worker(&mut app);

        assert_eq!(app.shell.view(), View::Upload);
        assert!(app.store.project().is_none());
        let status = app.status.as_ref().unwrap();
        assert_eq!(status.title, "Upload failed");
        assert!(status.description.contains("Answer_LLM"));
    }

    #[test]
    fn test_upload_requires_file_and_name() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path());

        app.apply(Action::Upload);
        assert_eq!(app.status.as_ref().unwrap().title, "No file selected");

        app.form.path = Some(dir.path().join("a.csv"));
        app.form.name = "  ".to_string();
        app.apply(Action::Upload);
        assert_eq!(app.status.as_ref().unwrap().title, "Project name required");
        assert!(!app.busy);
    }

    #[test]
    fn test_drop_invalid_extension() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path());
        app.apply(Action::DropFile(PathBuf::from("notes.docx")));
        assert!(app.form.path.is_none());
        assert_eq!(app.status.as_ref().unwrap().title, "Invalid file format");
    }

    #[test]
    fn test_blocked_then_finish_moves_to_export() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path());
        load_items(&mut app, 1);

        app.apply(Action::SetAgreement(true));
        app.apply(Action::Next);
        assert_eq!(app.status.as_ref().unwrap().level, NoticeLevel::Warning);
        assert_eq!(app.shell.view(), View::Evaluate);

        app.apply(Action::SetRelevance(Relevance::Low));
        app.apply(Action::SetFactuality(Factuality::Incorrect));
        assert_eq!(app.status.as_ref().unwrap().title, "Evaluation saved");
        app.apply(Action::Next);
        assert_eq!(app.shell.view(), View::Export);
        assert_eq!(app.store.completed(), 1);
    }

    #[test]
    fn test_save_mid_review_stays_in_evaluate() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path());
        load_items(&mut app, 3);
        app.apply(Action::SetAgreement(true));

        let out = dir.path().join("exports");
        app.apply(Action::ExportTo(out.clone()));
        assert!(app.busy);
        wait_for_worker(&mut app);

        assert_eq!(app.shell.view(), View::Evaluate);
        let status = app.status.as_ref().unwrap();
        assert_eq!(status.title, "Export complete");
        assert!(status.description.contains("demo_evaluations_"));
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);
    }

    #[test]
    fn test_keys_ignored_while_typing() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path());
        load_items(&mut app, 2);
        app.apply(Action::SetAgreement(false));
        app.apply(Action::SetRelevance(Relevance::High));
        app.apply(Action::SetFactuality(Factuality::Correct));

        app.apply(Action::Key { key: Key::ArrowRight, in_text_input: true });
        assert_eq!(app.store.project().unwrap().current_index, 0);

        app.apply(Action::Key { key: Key::ArrowRight, in_text_input: false });
        assert_eq!(app.store.project().unwrap().current_index, 1);
    }

    #[test]
    fn test_reset_returns_to_upload() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path());
        load_items(&mut app, 1);
        app.apply(Action::ShowResults);
        assert_eq!(app.shell.view(), View::Export);

        app.apply(Action::Reset);
        assert_eq!(app.shell.view(), View::Upload);
        assert!(app.store.project().is_none());
        assert!(app.workflow.item().is_none());
    }

    #[test]
    fn test_restored_project_starts_in_evaluate() {
        let dir = tempdir().expect("Failed to create temp dir");
        {
            let mut app = test_app(dir.path());
            load_items(&mut app, 3);
        }
        let app = test_app(dir.path());
        assert_eq!(app.shell.view(), View::Evaluate);
        assert_eq!(app.status.as_ref().unwrap().title, "Project loaded");
    }

    #[test]
    fn test_sign_in_and_out_persist() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path());
        app.apply(Action::SignOut);
        assert_eq!(app.shell.screen(&app.config), Screen::Landing);

        app.reviewer_input = "Mariam".to_string();
        app.apply(Action::SignIn);
        let saved = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(saved.reviewer.as_deref(), Some("Mariam"));
        assert_eq!(app.shell.screen(&app.config), Screen::Upload);
    }
}
