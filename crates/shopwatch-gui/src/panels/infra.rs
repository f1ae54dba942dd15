use eframe::egui;
use shopwatch_services::{BuiltinProfile, DashboardModel, LoadRun, LoadService, LoadSummary};

use super::badge;

/// Infrastructure view: API health details plus the load profile launcher.
pub struct InfraPanel {
    profile: BuiltinProfile,
    /// Base address override; empty runs against the profile's own target.
    target: String,
}

impl Default for InfraPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl InfraPanel {
    pub fn new() -> Self {
        Self {
            profile: BuiltinProfile::HpaTrigger,
            target: String::new(),
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, model: &DashboardModel, load: &LoadService, run: &mut LoadRun) {
        ui.heading("Infrastructure");
        ui.add_space(8.0);

        egui::Grid::new("infra_grid")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label("API base:");
                ui.label(egui::RichText::new(model.api_base()).monospace());
                ui.end_row();

                ui.label("API:");
                badge(ui, &model.health.api_badge);
                ui.end_row();

                ui.label("PostgreSQL:");
                badge(ui, &model.health.postgres_badge);
                ui.end_row();

                ui.label("Redis:");
                ui.label(&model.health.redis_label);
                ui.end_row();
            });

        ui.add_space(16.0);
        ui.separator();
        self.render_load(ui, load, run);
    }

    fn render_load(&mut self, ui: &mut egui::Ui, load: &LoadService, run: &mut LoadRun) {
        ui.label(egui::RichText::new("Load test").strong());
        ui.add_space(4.0);

        let running = run.is_running();

        ui.add_enabled_ui(!running, |ui| {
            egui::Grid::new("load_config_grid")
                .num_columns(2)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Profile:");
                    egui::ComboBox::from_id_salt("load_profile")
                        .selected_text(self.profile.name())
                        .show_ui(ui, |ui| {
                            for &p in BuiltinProfile::all() {
                                ui.selectable_value(&mut self.profile, p, p.name());
                            }
                        });
                    ui.end_row();

                    let profile = self.profile.profile();
                    ui.label("Target:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.target)
                            .hint_text(profile.base_url)
                            .desired_width(260.0),
                    );
                    ui.end_row();
                });

            let profile = self.profile.profile();
            ui.label(egui::RichText::new(&profile.description).weak());
            let thresholds: Vec<String> = profile.thresholds.iter().map(|t| t.to_string()).collect();
            ui.label(egui::RichText::new(thresholds.join("  ·  ")).monospace().weak());
        });

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if running {
                if ui.button("⏹ Cancel").clicked() {
                    run.cancel();
                }
                ui.spinner();
                if let Some((index, total, target)) = run.stage {
                    ui.label(format!("Stage {}/{} → {} VUs", index + 1, total, target));
                }
            } else if ui.button("▶ Start").clicked() {
                let target = self.target.trim();
                let mut profile = self.profile.profile();
                if !target.is_empty() {
                    profile = profile.with_base_url(target);
                }
                load.start(run, profile);
            }
        });

        if running {
            ui.add(
                egui::ProgressBar::new(run.progress())
                    .show_percentage()
                    .text(format!(
                        "{} VUs · {} requests · {} failed",
                        run.active_vus, run.requests, run.failed
                    )),
            );
        }

        if let Some(summary) = &run.summary {
            ui.add_space(8.0);
            summary_grid(ui, summary);
        }

        if !run.log.is_empty() {
            ui.add_space(8.0);
            egui::ScrollArea::vertical()
                .max_height(160.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in &run.log {
                        ui.label(egui::RichText::new(line).monospace());
                    }
                });
        }
    }
}

fn summary_grid(ui: &mut egui::Ui, summary: &LoadSummary) {
    let verdict = if summary.passed {
        egui::RichText::new("PASSED").color(egui::Color32::from_rgb(50, 205, 50))
    } else {
        egui::RichText::new("FAILED").color(egui::Color32::from_rgb(220, 50, 50))
    };
    ui.label(verdict.strong());

    egui::Grid::new("load_summary")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .striped(true)
        .show(ui, |ui| {
            let l = &summary.latency;
            let rows = [
                ("Requests", format!("{} ({:.1}/s)", summary.requests, summary.requests_per_sec)),
                ("Failed", format!("{:.2}%", summary.failed_rate * 100.0)),
                ("Iterations", summary.iterations.to_string()),
                ("Peak VUs", summary.peak_vus.to_string()),
                ("Latency avg", format!("{:.1} ms", l.avg_ms)),
                ("p90 / p95 / p99", format!("{:.1} / {:.1} / {:.1} ms", l.p90_ms, l.p95_ms, l.p99_ms)),
            ];
            for (name, value) in rows {
                ui.label(name);
                ui.label(value);
                ui.end_row();
            }

            for verdict in &summary.thresholds {
                ui.label(verdict.threshold.to_string());
                let mark = if verdict.passed { "✓" } else { "✗" };
                ui.label(format!("{} observed {:.3}", mark, verdict.observed));
                ui.end_row();
            }
        });
}
