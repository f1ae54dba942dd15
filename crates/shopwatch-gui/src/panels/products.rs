use eframe::egui;
use shopwatch_services::dashboard::{OrderResult, ProductCard, ProductsView};
use shopwatch_services::DashboardModel;

use super::badge;

const CARD_WIDTH: f32 = 220.0;

pub enum ProductsAction {
    Select(i64),
    PlaceOrder,
    Reload,
}

fn card(ui: &mut egui::Ui, card: &ProductCard, selected: bool) -> bool {
    let mut frame = egui::Frame::group(ui.style()).inner_margin(egui::Margin::same(8.0));
    if selected {
        frame = frame.stroke(egui::Stroke::new(2.0, egui::Color32::from_rgb(80, 160, 255)));
    }

    let mut clicked = false;
    frame.show(ui, |ui| {
        ui.vertical(|ui| {
            ui.set_width(CARD_WIDTH);
            ui.label(egui::RichText::new(&card.product.name).strong());
            ui.label(egui::RichText::new(&card.price_label).heading());

            let fill = if card.low_stock {
                egui::Color32::from_rgb(255, 140, 0)
            } else {
                egui::Color32::from_rgb(50, 160, 90)
            };
            ui.add(
                egui::ProgressBar::new(card.stock_percent as f32 / 100.0)
                    .desired_width(CARD_WIDTH)
                    .fill(fill)
                    .text(format!("Stock {}", card.product.stock)),
            );
            if card.low_stock {
                ui.colored_label(egui::Color32::from_rgb(255, 140, 0), "⚠ Low stock");
            }

            let label = if selected { "✔ Selected" } else { "Select" };
            clicked = ui.add_enabled(!selected, egui::Button::new(label)).clicked();
        });
    });
    clicked
}

fn order_form(ui: &mut egui::Ui, model: &mut DashboardModel, actions: &mut Vec<ProductsAction>) {
    ui.label(egui::RichText::new("Place order").strong());
    ui.separator();

    egui::Grid::new("order_form")
        .num_columns(2)
        .spacing([10.0, 6.0])
        .show(ui, |ui| {
            ui.label("Product:");
            let label = model.selected_label();
            if label.is_empty() {
                ui.label(egui::RichText::new("Select a product").weak());
            } else {
                ui.label(label);
            }
            ui.end_row();

            ui.label("Quantity:");
            ui.add(egui::TextEdit::singleline(&mut model.order_form.quantity).desired_width(60.0));
            ui.end_row();

            let default_email = model.config().default_email.clone();
            ui.label("Email:");
            ui.add(
                egui::TextEdit::singleline(&mut model.order_form.email)
                    .hint_text(default_email)
                    .desired_width(220.0),
            );
            ui.end_row();
        });

    ui.add_space(6.0);
    let pending = model.order_result == OrderResult::Pending;
    if ui.add_enabled(!pending, egui::Button::new("🛒 Order")).clicked() {
        actions.push(ProductsAction::PlaceOrder);
    }

    ui.add_space(6.0);
    match &model.order_result {
        OrderResult::Hidden => {}
        OrderResult::Pending => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Processing order...");
            });
        }
        OrderResult::Placed(confirmation) => {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.label(egui::RichText::new("✅ Order placed").strong());
                ui.label(format!("Order ID: {}", confirmation.short_order_id));
                ui.label(format!("Product: {}", confirmation.product));
                ui.label(format!("Total: {}", confirmation.total_label));
                ui.horizontal(|ui| {
                    badge(ui, &confirmation.status_badge);
                    badge(ui, &confirmation.source_badge);
                });
            });
        }
        OrderResult::Failed(message) => {
            ui.colored_label(egui::Color32::from_rgb(220, 50, 50), format!("❌ {}", message));
        }
    }
}

pub fn ui(ui: &mut egui::Ui, model: &mut DashboardModel) -> Vec<ProductsAction> {
    let mut actions = Vec::new();

    ui.horizontal(|ui| {
        ui.heading("Products");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("🔄 Refresh").clicked() {
                actions.push(ProductsAction::Reload);
            }
        });
    });
    ui.separator();

    egui::SidePanel::right("order_form_panel")
        .default_width(300.0)
        .show_inside(ui, |ui| order_form(ui, model, &mut actions));

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| match &model.products {
            ProductsView::Idle => {}
            ProductsView::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading...");
                });
            }
            ProductsView::Failed { message, url } => {
                ui.colored_label(egui::Color32::from_rgb(220, 50, 50), message);
                ui.label(egui::RichText::new(url).monospace().weak());
            }
            ProductsView::Loaded(cards) if cards.is_empty() => {
                ui.label("No products.");
            }
            ProductsView::Loaded(cards) => {
                ui.horizontal_wrapped(|ui| {
                    for c in cards {
                        if card(ui, c, model.is_selected(c.product.id)) {
                            actions.push(ProductsAction::Select(c.product.id));
                        }
                    }
                });
            }
        });

    actions
}
