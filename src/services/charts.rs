//! Chart data preparation and PNG rendering. Rendering is CPU-bound and
//! must be called through `spawn_blocking`.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use image::ImageEncoder;
use plotters::coord::types::RangedDateTime;
use plotters::prelude::*;
use sqlx::SqlitePool;

use crate::db;
use crate::db::mood_logs::SortOrder;
use crate::error::{AppError, AppResult};
use crate::models::user::User;
use crate::services::timewindow::TimeWindow;

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;
const MOOD_GREEN: RGBColor = RGBColor(76, 175, 80);

/// Everything the renderer needs, in the user's local time.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub title: &'static str,
    pub x_start: NaiveDateTime,
    pub x_end: NaiveDateTime,
    pub points: Vec<(NaiveDateTime, f64)>,
}

pub async fn chart_data_for(
    pool: &SqlitePool,
    user: &User,
    window: TimeWindow,
    now: DateTime<Utc>,
) -> AppResult<ChartData> {
    let tz = user.tz();
    let start_utc = window.start_utc(tz, now);
    let logs =
        db::mood_logs::for_user_since(pool, &user.id, start_utc.naive_utc(), SortOrder::Asc)
            .await?;

    let points = logs
        .iter()
        .map(|log| {
            let local = Utc.from_utc_datetime(&log.created_at).with_timezone(&tz);
            (local.naive_local(), log.rating as f64)
        })
        .collect();

    Ok(ChartData {
        title: window.title(),
        x_start: start_utc.with_timezone(&tz).naive_local(),
        x_end: now.with_timezone(&tz).naive_local(),
        points,
    })
}

/// Draws the mood line over the window and encodes it as a PNG. The image
/// itself carries no text, the title travels as the photo caption.
pub fn render_png(data: &ChartData) -> AppResult<Vec<u8>> {
    let mut rgb = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(24)
            .build_cartesian_2d(RangedDateTime::from(data.x_start..data.x_end), 0f64..11f64)
            .map_err(render_err)?;

        // Label budgets drive the gridline key points. No label areas are
        // allocated, so no text is ever drawn and no font backend is needed.
        chart
            .configure_mesh()
            .x_labels(8)
            .y_labels(12)
            .light_line_style(&RGBColor(235, 235, 235))
            .bold_line_style(&RGBColor(210, 210, 210))
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(LineSeries::new(
                data.points.iter().copied(),
                MOOD_GREEN.stroke_width(2),
            ))
            .map_err(render_err)?;
        chart
            .draw_series(
                data.points
                    .iter()
                    .map(|point| Circle::new(*point, 4, MOOD_GREEN.filled())),
            )
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png)
        .write_image(&rgb, WIDTH, HEIGHT, image::ColorType::Rgb8)
        .map_err(render_err)?;
    Ok(png)
}

fn render_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Render(e.to_string())
}

// ── Tests ────────────────────────────────────────────────────────────
