//! Page navigation.
//!
//! `sealen open <page>` goes through the same route guard a navigation bar
//! would: protected pages redirect to login, pages the user's role cannot see
//! redirect with a warning.

use sealen_client::routes::redirect_for;
use sealen_client::services::DashboardService;
use sealen_client::session::SessionStore;
use sealen_client::{ClientError, Navigation, Notice, Page};
use sealen_core::access;

use super::{CliError, Context, certification, robot, shop};
use crate::output;

/// Rental lengths shown on the rent page, one per discount tier.
const SAMPLE_RENTAL_DAYS: [u32; 4] = [7, 30, 90, 180];

/// Resolve `name` to a page, run the guard and render the result.
pub async fn open<S: SessionStore>(ctx: &mut Context<S>, name: &str) -> Result<(), CliError> {
    let page: Page = name.parse().map_err(CliError::argument)?;
    show(ctx, page).await
}

/// Run the guard for `page` and render it or the redirect target.
pub async fn show<S: SessionStore>(ctx: &mut Context<S>, page: Page) -> Result<(), CliError> {
    match ctx.guard.authorize(page) {
        Navigation::Allow(page) => render(ctx, page).await,
        Navigation::RedirectToLogin { return_to } => {
            output::notice(&Notice::info(format!(
                "Please log in to open {}",
                return_to.title()
            )));
            render(ctx, Page::Login).await
        }
        Navigation::RedirectHome { denial } => {
            output::notice(&Notice::warning(denial.to_string()));
            render(ctx, redirect_for(denial)).await
        }
    }
}

/// Open the page that resolves a refused action, then hand the refusal
/// back so the command still fails.
pub async fn follow_denial<S: SessionStore>(
    ctx: &mut Context<S>,
    result: Result<(), CliError>,
) -> Result<(), CliError> {
    if let Err(CliError::Client(ClientError::AccessDenied(denial))) = &result {
        let target = redirect_for(*denial);
        output::notice(&Notice::info(format!("Opening {}", target.title())));
        show(ctx, target).await?;
    }
    result
}

/// Open the page a login redirect interrupted, if any.
pub async fn resume<S: SessionStore>(ctx: &mut Context<S>) -> Result<(), CliError> {
    if let Some(page) = ctx.guard.take_return_to::<Page>() {
        output::line("");
        output::notice(&Notice::info(format!("Returning to {}", page.title())));
        show(ctx, page).await?;
    }
    Ok(())
}

/// Show a page the guard already admitted.
async fn render<S: SessionStore>(ctx: &mut Context<S>, page: Page) -> Result<(), CliError> {
    output::heading(page.title());

    match page {
        Page::Home => {
            home(ctx);
            Ok(())
        }
        Page::Products => shop::products(ctx, None).await,
        Page::Rent => {
            shop::robots(ctx).await?;
            output::line("");
            for days in SAMPLE_RENTAL_DAYS {
                shop::quote(ctx, days)?;
            }
            Ok(())
        }
        Page::Certification => {
            certification::modules(ctx).await?;
            output::line("");
            certification::progress(ctx).await
        }
        Page::Technology => {
            output::line(TECHNOLOGY);
            Ok(())
        }
        Page::Control => robot::fleet(ctx).await,
        Page::Dashboard => dashboard(ctx).await,
        Page::Login => {
            output::line("Run `sealen login --email <email>` to sign in");
            Ok(())
        }
        Page::Register => {
            output::line(
                "Run `sealen register --name <name> --email <email> --role <role>` to create an account",
            );
            Ok(())
        }
    }
}

fn home<S: SessionStore>(ctx: &Context<S>) {
    let user = ctx.guard.current_user();
    match user {
        Some(user) => output::line(format!("Logged in as {} ({})", user.full_name, user.role)),
        None => output::line("Not logged in"),
    }

    let visible: Vec<&str> = Page::ALL
        .iter()
        .filter(|page| match page {
            Page::Control => access::can_access_control_panel(user),
            Page::Dashboard => access::can_access_dashboard(user),
            Page::Login | Page::Register => user.is_none(),
            _ => true,
        })
        .map(|page| page.as_str())
        .collect();
    output::line(format!("Pages: {}", visible.join(", ")));
}

/// Fleet metrics.
pub async fn dashboard<S: SessionStore>(ctx: &Context<S>) -> Result<(), CliError> {
    let overview = DashboardService::new(ctx.api())
        .overview(&ctx.guard)
        .await?;
    output::overview(&overview);
    Ok(())
}

const TECHNOLOGY: &str = "\
Sealen CleanBots are autonomous surface robots that collect floating waste
in harbours, bays and river mouths.

  - Solar-assisted battery with automatic return to dock
  - Water temperature, pH and turbidity sensors
  - Manual control from the operator console, or autonomous patrol routes";
