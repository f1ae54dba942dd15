use std::io::{self, BufRead, Write};

use anyhow::Result;
use shopwatch_core::{ShopwatchConfig, Tab};

use crate::render::{self, print_lines, OutputFormat};
use crate::session::Session;

pub async fn run_interactive(config: &ShopwatchConfig) -> Result<()> {
    display_welcome();

    let mut session = crate::new_session(config);
    let fetch = session.model.show_tab(Tab::Dashboard);
    session.run(fetch, false).await;
    render_tab(&session);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("[{}] > ", session.model.active_tab().name());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();
        let arg = parts.get(1).copied();

        match cmd.as_str() {
            "help" | "h" | "?" => display_help(),
            "tab" | "t" => match arg.map(str::parse::<Tab>) {
                Some(Ok(tab)) => show_tab(&mut session, tab).await,
                _ => println!("Usage: tab <dashboard|products|history|infra>"),
            },
            "dashboard" | "d" => show_tab(&mut session, Tab::Dashboard).await,
            "products" | "p" => show_tab(&mut session, Tab::Products).await,
            "history" | "hi" => show_tab(&mut session, Tab::History).await,
            "infra" | "i" => show_tab(&mut session, Tab::Infra).await,
            "refresh" | "r" => {
                let tab = session.model.active_tab();
                show_tab(&mut session, tab).await;
            }
            "select" | "sel" => match arg.and_then(|a| a.parse::<i64>().ok()) {
                Some(id) if session.model.select_product(id) => {
                    println!("  Selected: {}", session.model.selected_label());
                }
                Some(id) => println!("  No product #{} in the current listing (try `products`)", id),
                None => println!("Usage: select <product id>"),
            },
            "qty" | "quantity" => {
                session.model.order_form.quantity = arg.unwrap_or_default().to_string();
                println!("  Quantity: {}", session.model.order_form.parsed_quantity());
            }
            "email" => {
                session.model.order_form.email = arg.unwrap_or_default().to_string();
                println!(
                    "  Email: {}",
                    session.model.order_form.email_or(&session.model.config().default_email)
                );
            }
            "order" | "o" => {
                let fetch = session.model.place_order();
                let placed = fetch.is_some();
                session.run(fetch, true).await;
                if placed {
                    print_lines(&render::order_result_lines(&session.model.order_result));
                }
            }
            "host" => match arg {
                Some(addr) => {
                    session.set_api_host(addr).await;
                    render_tab(&session);
                }
                None => println!("  API base: {}", session.model.api_base()),
            },
            "docs" => println!("  {}", session.model.docs_url()),
            "profiles" => crate::cmd_profiles(),
            "load" | "l" => {
                if let Err(e) = handle_load_command(&parts[1..]).await {
                    println!("Error: {}", e);
                }
            }
            "clear" | "cls" => {
                print!("\x1B[2J\x1B[1;1H");
                stdout.flush()?;
            }
            "exit" | "quit" | "q" => {
                println!("  Goodbye!");
                break;
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for available commands.", cmd);
            }
        }

        if let Some(toast) = session.model.toast() {
            println!("{}", render::toast_line(toast));
        }
    }

    Ok(())
}

async fn show_tab(session: &mut Session, tab: Tab) {
    let fetch = session.model.show_tab(tab);
    session.run(fetch, false).await;
    render_tab(session);
}

fn render_tab(session: &Session) {
    let model = &session.model;
    println!();
    match model.active_tab() {
        Tab::Dashboard => {
            print_lines(&render::health_lines(&model.health, model.api_base()));
            println!();
            print_lines(&render::metrics_lines(&model.metrics));
            println!();
            println!("Recent orders:");
            print_lines(&render::table_lines(&model.recent_orders));
        }
        Tab::Products => {
            print_lines(&render::products_lines(&model.products, |id| model.is_selected(id)));
            if model.selected_product().is_some() {
                println!();
                println!("  Selected: {}", model.selected_label());
            }
        }
        Tab::History => print_lines(&render::table_lines(&model.history)),
        Tab::Infra => {
            print_lines(&render::health_lines(&model.health, model.api_base()));
            println!("  Docs: {}", model.docs_url());
        }
    }
    println!();
}

async fn handle_load_command(args: &[&str]) -> Result<()> {
    if args.is_empty() {
        println!("Usage: load <profile> [--base URL]");
        println!("  Example: load hpa-trigger --base http://localhost:8000");
        return Ok(());
    }

    let mut base = None;
    let mut i = 1;
    while i < args.len() {
        if matches!(args[i], "-b" | "--base") && i + 1 < args.len() {
            base = Some(args[i + 1]);
            i += 1;
        }
        i += 1;
    }

    let profile = crate::resolve_profile(Some(args[0]), None, base)?;
    crate::cmd_load(profile, OutputFormat::Table).await
}

fn display_welcome() {
    println!();
    println!("  Shopwatch · shop API dashboard");
    println!();
    println!("  dashboard, products, history, infra   # switch tab (d, p, hi, i)");
    println!("  select <id>, qty <n>, email <addr>    # fill the order form");
    println!("  order                                  # place the order");
    println!("  help                                   # all commands");
    println!();
}

fn display_help() {
    println!();
    println!("Available Commands:");
    println!("  dashboard, d           Health, metrics and recent orders");
    println!("  products, p            Product listing with stock levels");
    println!("  history, hi            Last orders");
    println!("  infra, i               Infrastructure status and docs link");
    println!("  tab, t <name>          Switch tab by name");
    println!("  refresh, r             Reload the active tab");
    println!("  select <id>            Select a product for ordering");
    println!("  qty <n>                Order quantity (default 1)");
    println!("  email <addr>           Customer email (default guest address)");
    println!("  order, o               Place the order");
    println!("  host [addr]            Show or change the API base address");
    println!("  docs                   Print the API docs URL");
    println!("  profiles               List load profiles");
    println!("  load, l <profile>      Run a load profile (--base URL to retarget)");
    println!("  clear, cls             Clear screen");
    println!("  exit, quit, q          Leave");
    println!();
}
