use eframe::egui;
use shopwatch_services::DashboardModel;

use super::{badge, order_table};

fn metric_card(ui: &mut egui::Ui, title: &str, value: &str) {
    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(10.0))
        .show(ui, |ui| {
            ui.set_min_width(180.0);
            ui.vertical(|ui| {
                ui.label(egui::RichText::new(title).weak());
                ui.label(egui::RichText::new(value).heading().strong());
            });
        });
}

pub fn ui(ui: &mut egui::Ui, model: &DashboardModel) {
    ui.heading("Dashboard");
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        metric_card(ui, "Total orders", &model.metrics.orders);
        metric_card(ui, "Revenue", &model.metrics.revenue);
        metric_card(ui, "Product views", &model.metrics.product_views);
        metric_card(ui, "PostgreSQL", &model.health.postgres_metric);
    });

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        ui.label("PostgreSQL:");
        badge(ui, &model.health.postgres_badge);
        ui.separator();
        ui.label("API:");
        badge(ui, &model.health.api_badge);
        ui.separator();
        ui.label(&model.health.redis_label);
    });

    ui.add_space(12.0);
    ui.label(egui::RichText::new("Recent orders").strong());
    ui.separator();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            order_table(ui, "recent_orders", &model.recent_orders);
        });
}
