use dotenvy::dotenv;
use menu_costing::{
    config::{
        catalog::{self, Config},
        database,
        settings::SettingsStore,
    },
    core::{event, ingredient, recipe, report},
    errors::Result,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Load the seed catalog and costing defaults
    let app_config = catalog::load_default_config().unwrap_or_else(|e| {
        warn!("{e}; starting without a seed catalog");
        Config::default()
    });

    // 4. Connect and make sure every table exists
    if std::env::var("DATABASE_URL").is_err() {
        std::fs::create_dir_all("data")?;
    }
    let db = database::create_connection()
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Seed missing catalog ingredients
    catalog::seed_ingredients(&db, &app_config)
        .await
        .inspect_err(|e| error!("Failed to seed ingredients: {}", e))?;

    for low in ingredient::get_low_stock_ingredients(&db).await? {
        warn!(
            "Low stock: {} ({} {} left, minimum {})",
            low.name, low.stock, low.unit, low.stock_minimum
        );
    }

    // 6. Log summaries, one page of each
    let settings = SettingsStore::new(&db).load().await?;
    let page = usize::try_from(settings.page_size).unwrap_or(usize::MAX);

    for recipe in recipe::get_all_recipes(&db).await?.into_iter().take(page) {
        let summary =
            report::generate_recipe_report(&db, recipe.id, app_config.costing.target_margin)
                .await?;
        info!("\n{}", report::format_recipe_report(&summary));
    }

    for event in event::get_all_events(&db).await?.into_iter().take(page) {
        let summary =
            report::generate_event_report(&db, event.id, app_config.costing.budget_factor)
                .await?;
        info!("\n{}", report::format_event_report(&summary));
    }

    Ok(())
}
