use std::time::Duration;

use eframe::egui;
use shopwatch_services::dashboard::ConnectionStatus;
use shopwatch_services::{
    DashboardModel, LoadRun, LoadService, RefreshSchedule, Services, ShopwatchConfig, Tab,
    ToastKind,
};

use crate::panels::{
    dashboard, history,
    infra::InfraPanel,
    products::{self, ProductsAction},
};

const REPAINT_EVERY: Duration = Duration::from_millis(100);

pub struct ShopwatchApp {
    services: Services,
    model: DashboardModel,
    schedule: RefreshSchedule,
    load_run: LoadRun,
    infra: InfraPanel,
}

impl ShopwatchApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: ShopwatchConfig) -> Self {
        let services = Services::new(config);
        let mut model = services.dashboard_model();
        let schedule = services.refresh_schedule();

        // Initial tab load
        services.dashboard.dispatch_opt(model.show_tab(Tab::Dashboard));

        Self {
            infra: InfraPanel::new(),
            services,
            model,
            schedule,
            load_run: LoadRun::default(),
        }
    }

    fn render_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("🛒 Shopwatch");
            ui.separator();

            let color = match self.model.health.status {
                ConnectionStatus::Online => egui::Color32::GREEN,
                ConnectionStatus::Offline => egui::Color32::RED,
                ConnectionStatus::Unknown => egui::Color32::GRAY,
            };
            ui.colored_label(color, "●");
            ui.label(&self.model.health.status_text);

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.link("📖 API docs").clicked() {
                    let url = self.model.docs_url();
                    if let Err(e) = open::that(&url) {
                        tracing::warn!("Failed to open {}: {}", url, e);
                    }
                }

                ui.separator();

                let apply = ui.button("Apply").clicked();
                let edit = ui.add(
                    egui::TextEdit::singleline(&mut self.model.api_host_input)
                        .desired_width(240.0)
                        .hint_text("http://host:port"),
                );
                ui.label("API:");

                let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if apply || submitted {
                    let input = self.model.api_host_input.clone();
                    for fetch in self.model.update_api_host(&input) {
                        self.services.dashboard.dispatch(fetch);
                    }
                }
            });
        });
    }

    fn render_tabs(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for &tab in Tab::all() {
                let active = self.model.active_tab() == tab;
                if ui.selectable_label(active, tab.label()).clicked() {
                    let fetch = self.model.show_tab(tab);
                    self.services.dashboard.dispatch_opt(fetch);
                }
            }
        });
    }

    fn render_toast(&self, ctx: &egui::Context) {
        let Some(toast) = self.model.toast() else { return };

        let color = match toast.kind {
            ToastKind::Info => egui::Color32::from_rgb(80, 160, 255),
            ToastKind::Success => egui::Color32::from_rgb(50, 205, 50),
            ToastKind::Warning => egui::Color32::from_rgb(255, 200, 0),
        };

        egui::Area::new(egui::Id::new("toast"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -16.0])
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.colored_label(color, &toast.message);
                });
            });
    }
}

impl eframe::App for ShopwatchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.services.dashboard.poll(&mut self.model, &mut self.schedule);
        self.services.dashboard.tick(&mut self.model, &mut self.schedule);
        LoadService::poll(&mut self.load_run);

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            self.render_header(ui);
            ui.add_space(4.0);
            self.render_tabs(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.model.active_tab() {
            Tab::Dashboard => dashboard::ui(ui, &self.model),
            Tab::Products => {
                for action in products::ui(ui, &mut self.model) {
                    match action {
                        ProductsAction::Select(id) => {
                            self.model.select_product(id);
                        }
                        ProductsAction::PlaceOrder => {
                            let fetch = self.model.place_order();
                            self.services.dashboard.dispatch_opt(fetch);
                        }
                        ProductsAction::Reload => {
                            let fetch = self.model.load_products();
                            self.services.dashboard.dispatch(fetch);
                        }
                    }
                }
            }
            Tab::History => {
                if history::ui(ui, &self.model) {
                    let fetch = self.model.load_history();
                    self.services.dashboard.dispatch(fetch);
                }
            }
            Tab::Infra => self.infra.ui(ui, &self.model, &self.services.load, &mut self.load_run),
        });

        self.render_toast(ctx);

        ctx.request_repaint_after(REPAINT_EVERY);
    }
}
