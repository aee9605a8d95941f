//! The `edit` command: a line-driven rendition of the price list view.

use crate::table;
use api_client::PriceListClient;
use core_types::ProductField;
use editor::{LoadState, PriceListView, SaveOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  <id> <field> <value>   type into a cell (saved after 800 ms)
  !<id> <field> <value>  type into a cell and press Enter (saved now)
  blur <id> <field>      leave a cell and show its formatted value
  select <id>            toggle the row marker
  show                   print the list again
  reload                 load the list again (retry after an error)
  quit                   save pending edits and exit
Fields: article_no, product_service, in_price, price, unit, in_stock, description";

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Input {
        id: i32,
        field: ProductField,
        value: &'a str,
        enter: bool,
    },
    Blur(i32, ProductField),
    Select(i32),
    Show,
    Reload,
    Help,
    Quit,
}

fn parse_line(line: &str) -> Result<Line<'_>, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (enter, rest) = match line.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let mut parts = rest.splitn(3, ' ');
    let head = parts.next().unwrap_or_default().trim();

    match head {
        "" | "show" if !enter => Ok(Line::Show),
        "help" | "?" if !enter => Ok(Line::Help),
        "quit" | "exit" if !enter => Ok(Line::Quit),
        "reload" if !enter => Ok(Line::Reload),
        "select" if !enter => Ok(Line::Select(parse_id(parts.next())?)),
        "blur" if !enter => {
            let id = parse_id(parts.next())?;
            let field = parse_field(parts.next())?;
            Ok(Line::Blur(id, field))
        }
        _ => {
            let id = parse_id(Some(head))?;
            let field = parse_field(parts.next())?;
            Ok(Line::Input {
                id,
                field,
                value: parts.next().unwrap_or_default(),
                enter,
            })
        }
    }
}

fn parse_id(part: Option<&str>) -> Result<i32, String> {
    let part = part.map(str::trim).unwrap_or_default();
    part.parse()
        .map_err(|_| format!("`{part}` is not a product id (try `help`)"))
}

fn parse_field(part: Option<&str>) -> Result<ProductField, String> {
    let part = part.map(str::trim).unwrap_or_default();
    part.parse().map_err(|_| format!("`{part}` is not a field (try `help`)"))
}

fn print_header(client: &PriceListClient) {
    println!("Price List  |  {}", client.base_url());
    println!("Type `help` for commands.");
}

fn print_view(view: &PriceListView) {
    match view.state() {
        LoadState::Loading => println!("Loading products..."),
        LoadState::Failed(message) => {
            println!("Error: {message}");
            println!("Type `reload` to retry.");
        }
        LoadState::Ready => println!("{}", table::products(view.products(), view.selected())),
    }
}

fn report(outcomes: Vec<SaveOutcome>) {
    for outcome in outcomes {
        match outcome {
            SaveOutcome::Saved(key) => println!("saved {} of product {}", key.field, key.id),
            SaveOutcome::Failed {
                key,
                error,
                rolled_back,
            } => {
                let note = if rolled_back { " (reverted)" } else { "" };
                println!("could not save {} of product {}: {error}{note}", key.field, key.id);
            }
        }
    }
}

pub async fn run(client: PriceListClient) -> anyhow::Result<()> {
    print_header(&client);
    let mut view = PriceListView::new(Arc::new(client));
    view.load().await;
    print_view(&view);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(Duration::from_millis(200));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Ok(Line::Quit) => break,
                    Ok(line) => handle(&mut view, line).await,
                    Err(message) => println!("{message}"),
                }
            }
            _ = tick.tick() => report(view.process_outcomes()),
        }
    }

    report(view.flush().await);
    Ok(())
}

async fn handle(view: &mut PriceListView, line: Line<'_>) {
    if !matches!(line, Line::Reload | Line::Help) && view.state() != &LoadState::Ready {
        print_view(view);
        return;
    }

    match line {
        Line::Input {
            id,
            field,
            value,
            enter: false,
        } => {
            if let Err(err) = view.input(id, field, value) {
                println!("{err}");
            }
        }
        Line::Input {
            id,
            field,
            value,
            enter: true,
        } => match view.enter(id, field, value).await {
            Ok(outcome) => report(vec![outcome]),
            Err(err) => println!("{err}"),
        },
        Line::Blur(id, field) => match view.blur(id, field) {
            Ok(text) => println!("{field} of product {id}: {text}"),
            Err(err) => println!("{err}"),
        },
        Line::Select(id) => {
            view.select(id);
            print_view(view);
        }
        Line::Show => print_view(view),
        Line::Reload => {
            view.load().await;
            print_view(view);
        }
        Line::Help => println!("{HELP}"),
        Line::Quit => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystrokes_and_enter_saves() {
        assert_eq!(
            parse_line("3 price 1 200"),
            Ok(Line::Input {
                id: 3,
                field: ProductField::Price,
                value: "1 200",
                enter: false
            })
        );
        assert_eq!(
            parse_line("!3 description"),
            Ok(Line::Input {
                id: 3,
                field: ProductField::Description,
                value: "",
                enter: true
            })
        );
    }

    #[test]
    fn session_commands() {
        assert_eq!(parse_line(""), Ok(Line::Show));
        assert_eq!(parse_line("reload"), Ok(Line::Reload));
        assert_eq!(parse_line("select 4"), Ok(Line::Select(4)));
        assert_eq!(
            parse_line("blur 4 in-stock"),
            Ok(Line::Blur(4, ProductField::InStock))
        );
        assert_eq!(parse_line("quit"), Ok(Line::Quit));
    }

    #[test]
    fn bad_lines_explain_themselves() {
        assert!(parse_line("x price 1").unwrap_err().contains("not a product id"));
        assert!(parse_line("1 colour red").unwrap_err().contains("not a field"));
    }
}
