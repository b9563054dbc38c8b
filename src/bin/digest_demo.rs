//! Runs the digest pipeline once and prints groups plus the chunked report.
//!
//! Usage: `digest_demo [FILE]`. FILE holds posts separated by lines containing only
//! `---`; without it a few built-in sample posts are used.

use std::sync::Arc;

use anyhow::Context;
use channel_digest::ai_bootstrap::AiRuntime;
use channel_digest::config::ai::DEFAULT_AI_CONFIG_PATH;
use channel_digest::embed::build_embedder;
use channel_digest::{DigestConfig, DigestPipeline};

const SAMPLE_POSTS: &[&str] = &[
    "Московская биржа запустила фьючерсы на природный газ Dutch TTF. \
     В последнее время запасы газа в Европе находятся на минимальных уровнях за три года, \
     что отражается на цене топлива на европейских биржах. \
     Голландский TTF Gas — ведущая европейская эталонная цена, поскольку объемы торгов \
     более чем в 14 раз превышают объемы газа, используемого Нидерландами.",
    "Утренний дайджест: торговые войны и цены на нефть, данные по инфляции в России. \
     Валютные курсы ЦБ РФ: USD/RUB 85,46 (-0,84%), EUR/RUB 93,78 (-1,05%). \
     Brent: 60,20 (-1,73%), Urals: 53,66 (-2,08%). \
     В ходе торгов стоимость нефти марки Brent упала ниже $61 за баррель впервые с марта 2021 года.",
    "Сбербанк опубликовал (https://www.sberbank.ru/ru/sberpress/vazhnoe/article?newsID=3af08b0a) \
     отчет РПБУ за март и первые три месяца 2025 года. Чистая прибыль продолжает расти, \
     а рентабельность капитала в первом квартале составила 22,6%. \
     Розничный кредитный портфель Сбера вырос на 0,3% за счет ипотечного кредитования и кредитных карт.",
    "Сбер отчитался по РПБУ за первый квартал 2025 года. Чистая прибыль продолжает расти, \
     рентабельность капитала в первом квартале составила 22,6%. \
     Розничный кредитный портфель Сбера вырос на 0,3% за счет ипотеки и кредитных карт.",
    "Коротко: без комментариев",
];

fn read_posts(path: &str) -> anyhow::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading posts from {path}"))?;
    let mut posts = Vec::new();
    let mut current = String::new();
    for line in raw.lines() {
        if line.trim() == "---" {
            posts.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    posts.push(current);
    Ok(posts.into_iter().filter(|p| !p.trim().is_empty()).collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let posts = match std::env::args().nth(1) {
        Some(path) => read_posts(&path)?,
        None => SAMPLE_POSTS.iter().map(|s| s.to_string()).collect(),
    };

    let cfg = DigestConfig::load()?;
    let ai = AiRuntime::from_path(DEFAULT_AI_CONFIG_PATH, &cfg.analysis)?;
    let embedder = build_embedder(&cfg.embedder)?;
    let marker = cfg.report.labels.item_marker.clone();
    let max_chars = cfg.report.max_message_chars;
    let pipeline = DigestPipeline::new(Arc::new(cfg), embedder, ai.client)?;

    let out = pipeline.run(&posts).await;

    println!("Группированные новости для отправки:");
    for (idx, group) in out.formatted_groups(&marker).iter().enumerate() {
        println!("\nПост {}:", idx + 1);
        for line in group {
            println!("{line}");
        }
    }

    println!();
    for (i, chunk) in out.report.chunks(max_chars).iter().enumerate() {
        if i > 0 {
            println!("\n--- message {} ---", i + 1);
        }
        println!("{chunk}");
    }

    println!("\nstats: {}", serde_json::to_string(&out.stats)?);
    Ok(())
}
