pub mod dashboard;
pub mod history;
pub mod infra;
pub mod products;

use eframe::egui;
use shopwatch_services::dashboard::{Badge, BadgeColor, OrderTable, SpanKind, TableRow};

pub fn badge_color(color: BadgeColor) -> egui::Color32 {
    match color {
        BadgeColor::Green => egui::Color32::from_rgb(50, 205, 50),
        BadgeColor::Red => egui::Color32::from_rgb(220, 50, 50),
        BadgeColor::Blue => egui::Color32::from_rgb(80, 160, 255),
        BadgeColor::Muted => egui::Color32::GRAY,
    }
}

pub fn badge(ui: &mut egui::Ui, badge: &Badge) {
    ui.label(
        egui::RichText::new(&badge.text)
            .color(badge_color(badge.color))
            .strong(),
    );
}

/// Striped grid for an order table. Spanning rows sit in the first column.
pub fn order_table(ui: &mut egui::Ui, id: &str, table: &OrderTable) {
    egui::Grid::new(id)
        .num_columns(table.columns)
        .spacing([12.0, 6.0])
        .striped(true)
        .show(ui, |ui| {
            for header in table.headers() {
                ui.label(egui::RichText::new(*header).strong());
            }
            ui.end_row();

            for row in &table.rows {
                match row {
                    TableRow::Cells(cells) => {
                        for cell in cells {
                            ui.label(cell);
                        }
                    }
                    TableRow::Span { text, kind, .. } => {
                        let text = egui::RichText::new(text);
                        ui.label(match kind {
                            SpanKind::Loading | SpanKind::Empty => text.weak(),
                            SpanKind::Error => text.color(egui::Color32::from_rgb(220, 50, 50)),
                        });
                    }
                }
                ui.end_row();
            }
        });
}
