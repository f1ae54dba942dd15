use eframe::egui;
use shopwatch_services::DashboardModel;

use super::order_table;

/// Renders the order history. Returns true when a reload was requested.
pub fn ui(ui: &mut egui::Ui, model: &DashboardModel) -> bool {
    let mut reload = false;

    ui.horizontal(|ui| {
        ui.heading("Order History");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            reload = ui.button("🔄 Refresh").clicked();
        });
    });
    ui.separator();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            order_table(ui, "history_table", &model.history);
        });

    reload
}
