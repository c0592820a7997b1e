use card_filter::config::{FilterRegistry, FilterType};
use card_filter::lexer::Lexer;
use card_filter::parser::{parse_filter, Parser};
use card_filter::FilterBoxModel;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

fn test_cases() -> Vec<(&'static str, &'static str)> {
    vec![
        ("simple", "CardType in Vampire"),
        ("medium", r#"Clan in Brujah, Gangrel and NOT CardText in "additional strike""#),
        (
            "complex",
            r#"(Clan in Brujah or Sect in Sabbat) and NOT (CardType in Equipment or Discipline in $var3) and CardCount in 2 FROM "My Deck" and Unique"#,
        ),
    ]
}

// 基准测试：词法分析性能
fn benchmark_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_performance");

    for (name, text) in test_cases() {
        group.bench_with_input(BenchmarkId::new("tokenize", name), &text, |b, &text| {
            b.iter(|| {
                let tokens: Vec<_> = Lexer::new(black_box(text)).collect();
                black_box(tokens)
            })
        });
    }

    group.finish();
}

// 基准测试：语法分析性能
fn benchmark_parser(c: &mut Criterion) {
    let registry = FilterRegistry::default();
    let mut group = c.benchmark_group("parser_performance");

    for (name, text) in test_cases() {
        // 预先词法分析
        let tokens: Vec<_> = Lexer::new(text).collect();

        group.bench_with_input(BenchmarkId::new("parse", name), &tokens, |b, tokens| {
            b.iter(|| {
                let mut parser = Parser::new(black_box(tokens), &registry, FilterType::PhysicalCard);
                black_box(parser.parse().ok())
            })
        });
    }

    group.finish();
}

// 基准测试：box model 构建与输出
fn benchmark_box_model(c: &mut Criterion) {
    let registry = FilterRegistry::default();
    let mut group = c.benchmark_group("box_model_performance");

    for (name, text) in test_cases() {
        let ast = parse_filter(text, &registry, FilterType::PhysicalCard).unwrap();

        group.bench_with_input(BenchmarkId::new("build", name), &ast, |b, ast| {
            b.iter(|| black_box(FilterBoxModel::build(Some(black_box(ast)), FilterType::PhysicalCard, None).ok()))
        });

        let model = FilterBoxModel::build(Some(&ast), FilterType::PhysicalCard, None).unwrap();
        group.bench_with_input(BenchmarkId::new("ast_with_values", name), &model, |b, model| {
            b.iter(|| black_box(model.get_ast_with_values()))
        });
        group.bench_with_input(BenchmarkId::new("text", name), &model, |b, model| {
            b.iter(|| black_box(model.get_text()))
        });
    }

    group.finish();
}

// 基准测试：端到端流程 (文本 → box model → 文本)
fn benchmark_round_trip(c: &mut Criterion) {
    let registry = FilterRegistry::default();
    let mut group = c.benchmark_group("round_trip_performance");

    for (name, text) in test_cases() {
        group.bench_with_input(BenchmarkId::new("round_trip", name), &text, |b, &text| {
            b.iter(|| {
                let ast = parse_filter(black_box(text), &registry, FilterType::PhysicalCard).ok()?;
                let model = FilterBoxModel::build(Some(&ast), FilterType::PhysicalCard, None).ok()?;
                Some(black_box(model.get_text()))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_lexer,
    benchmark_parser,
    benchmark_box_model,
    benchmark_round_trip
);
criterion_main!(benches);
