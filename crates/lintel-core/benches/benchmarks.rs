use std::hint::black_box;
use std::time::Instant;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lintel_core::config::LanguageOptions;
use lintel_core::fix::DEFAULT_MAX_PASSES;
use lintel_core::parser::parse;
use lintel_core::semantic::analyze;
use lintel_core::{FixOptions, LintConfig, Linter, RuleEntry, SourceFile};

const RULES: &[&str] = &[
    "eqeqeq",
    "no-console",
    "no-undef",
    "no-misleading-character-class",
];

fn config() -> LintConfig {
    RULES.iter().fold(LintConfig::new(), |config, rule| {
        config.with_rule(rule, RuleEntry::error())
    })
}

fn generate_500_loc_javascript() -> String {
    let mut code = String::with_capacity(20000);
    code.push_str("// Generated 500 LOC JavaScript file for benchmarking\n\n");

    for i in 0..25 {
        code.push_str(&format!(
            r#"function processEntity{i}(entity) {{
    const result = {{
        ...entity,
        updatedAt: new Date(),
    }};
    if (entity.metadata != null) {{
        result.metadata = {{ ...entity.metadata, processed: true }};
    }}
    if (typeof entity.name == "string") {{
        result.label = entity.name.replace(/[^\w-]/g, "");
    }}
    return result;
}}

async function fetchEntity{i}(id) {{
    const response = await fetch(`/api/entities/{i}/${{id}}`);
    if (response.status == 404) {{
        console.warn("missing", id);
        return null;
    }}
    for (const [key, value] of Object.entries(response.headers)) {{
        if (key === "x-trace") {{
            trace{i}(value);
        }}
    }}
    return response.json();
}}

"#,
            i = i
        ));
    }

    code
}

fn generate_100_files() -> Vec<SourceFile> {
    (0..100)
        .map(|i| {
            let filename = format!("file_{}.js", i);
            let content = format!(
                r#"export function process{i}(item) {{
    if (item.id == {i}) {{
        console.log(item);
    }}
    return {{ ...item, value: String(item.value).toUpperCase() }};
}}
"#,
                i = i
            );
            SourceFile::new(filename, content)
        })
        .collect()
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    let options = LanguageOptions::default();
    let code_500 = generate_500_loc_javascript();
    let lines_500 = code_500.lines().count();

    group.throughput(Throughput::Elements(lines_500 as u64));
    group.bench_function("parse_500_loc", |b| {
        b.iter(|| parse(black_box(&code_500), black_box(&options)))
    });

    let parsed = parse(&code_500, &options).expect("benchmark source parses");
    group.bench_function("scopes_500_loc", |b| {
        b.iter(|| analyze(black_box(parsed.ast()), black_box(&options)))
    });

    group.finish();
}

fn bench_rules(c: &mut Criterion) {
    let mut group = c.benchmark_group("rules");

    let linter = Linter::new();
    let config = config();

    let noisy_code = r#"
var x = 1;
if (x == y) {
    console.log("equal");
}
const flags = /[👍]/u;
new RegExp("[❇️]");
undefinedCall(x != null);
"#;

    group.bench_function("noisy_code", |b| {
        b.iter(|| linter.verify(black_box(noisy_code), &config, "noisy.js"))
    });

    let clean_code = r#"
const PI = 3.14159;

export function calculateArea(radius) {
    return PI * radius * radius;
}

export function formatResult(value, decimals = 2) {
    return value === null ? "" : value.toFixed(decimals);
}
"#;

    group.bench_function("clean_code", |b| {
        b.iter(|| linter.verify(black_box(clean_code), &config, "clean.js"))
    });

    let directive_code = format!(
        "/* lintel-disable no-console */\n{}\n/* lintel-enable */\n",
        noisy_code
    );
    group.bench_function("with_directives", |b| {
        b.iter(|| linter.verify(black_box(&directive_code), &config, "directives.js"))
    });

    group.finish();
}

fn bench_fixing(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixing");

    let linter = Linter::new();
    let config = config();
    let code_500 = generate_500_loc_javascript();
    let options = FixOptions::new();

    group.bench_function("verify_and_fix_500_loc", |b| {
        b.iter(|| linter.verify_and_fix(black_box(&code_500), &config, "large.js", &options))
    });

    for passes in [1, 2, DEFAULT_MAX_PASSES] {
        let options = FixOptions::new().with_max_passes(passes);
        group.bench_with_input(BenchmarkId::new("max_passes", passes), &options, |b, options| {
            b.iter(|| linter.verify_and_fix(black_box(&code_500), &config, "large.js", options))
        });
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");

    let linter = Linter::new();
    let config = config();
    let files = generate_100_files();

    for size in [10, 25, 50, 100] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("project_size", size), &size, |b, &size| {
            let subset = &files[..size];
            b.iter(|| linter.verify_batch(black_box(subset), &config))
        });
    }

    group.bench_function("sequential_100_files", |b| {
        b.iter(|| {
            for file in &files {
                let _ = linter.verify(black_box(&file.source), &config, &file.filename);
            }
        })
    });

    group.finish();
}

fn bench_latency_percentiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency");

    let linter = Linter::new();
    let config = config();
    let code_500 = generate_500_loc_javascript();

    group.bench_function("p95_500_loc_verify", |b| {
        b.iter_custom(|iters| {
            let mut durations: Vec<_> = (0..iters)
                .map(|_| {
                    let start = Instant::now();
                    let _ = linter.verify(black_box(&code_500), &config, "benchmark.js");
                    start.elapsed()
                })
                .collect();
            durations.sort();
            let p95_idx = ((iters as f64) * 0.95) as usize;
            let p95_idx = p95_idx.min(durations.len().saturating_sub(1));
            durations[p95_idx]
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parsing,
    bench_rules,
    bench_fixing,
    bench_batch,
    bench_latency_percentiles
);
criterion_main!(benches);
