use anyhow::{Context, Result};
use card_filter::config::{FilterRegistry, FilterType};
use card_filter::parser::parse_filter;
use card_filter::sql_compiler::SqlCompiler;
use card_filter::FilterBoxModel;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const DEFAULT_REGISTRY_FILE: &str = "filters.json";

/// 加载Filter注册表，优先使用JSON配置，失败时使用默认配置
fn load_registry(path: &str) -> FilterRegistry {
    match FilterRegistry::from_json_file(path) {
        Ok(registry) => {
            println!("✅ 成功从 {} 加载了 {} 个Filter", path, registry.filters.len());
            registry
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用默认配置", e);
            FilterRegistry::default()
        }
    }
}

/// 列出当前对象类型可用的Filter及其帮助信息
fn print_filters(registry: &FilterRegistry, filter_type: FilterType) {
    for def in registry.filters_for_type(filter_type) {
        println!("  {:<14} {:<16} {}", def.keyword, def.description, def.help_text);
    }
}

/// 解析一行Filter文本，构建box model并输出文本、变量和SQL
fn run_filter(input: &str, compiler: &SqlCompiler, filter_type: FilterType) -> Result<()> {
    let ast = parse_filter(input, compiler.registry(), filter_type).map_err(|e| match e.span {
        Some(span) => anyhow::anyhow!("解析失败: {} (位置 {})", e.message, span),
        None => anyhow::anyhow!("解析失败: {}", e.message),
    })?;

    let model = FilterBoxModel::build(Some(&ast), filter_type, None)
        .context("无法为该Filter打开结构化编辑器")?;

    println!("[Box model 文本]: {}", model.get_text());

    let values = model.get_current_values();
    if !values.is_empty() {
        println!("[变量]:");
        for (name, value) in values {
            match value {
                Some(value) => println!("  {} = {}", name, value),
                None => println!("  {} (未设置)", name),
            }
        }
    }

    match model.get_ast_with_values() {
        Some(bound) => {
            println!("[AST]: {:?}", bound);
            let sql = compiler.compile(&bound, filter_type)?;
            println!("[SQL]: {}", sql);
        }
        None => println!("Filter 为空"),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    println!("--- Card Filter: 文本 → box model → SQL ---");
    println!("输入Filter文本，:filters 列出可用Filter，:type card|set 切换对象类型");

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_REGISTRY_FILE.to_string());
    let compiler = SqlCompiler::new(load_registry(&path));
    let mut filter_type = FilterType::PhysicalCard;

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("filter> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;

                match line {
                    ":filters" => print_filters(compiler.registry(), filter_type),
                    ":type card" => filter_type = FilterType::PhysicalCard,
                    ":type set" => filter_type = FilterType::PhysicalCardSet,
                    _ => {
                        if let Err(e) = run_filter(line, &compiler, filter_type) {
                            println!("✗ {:#}", e);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
