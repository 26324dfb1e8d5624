use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sessorm::{
    Condition, Dialect, IntoParams, Join, JoinKind, MySql, Postgres, RawSql, Statement, TableRef,
    render_exist, render_select,
};

/// A statement with `n` joins and `n` bound conditions:
/// SELECT t.id FROM t INNER JOIN j0 ON j0.t_id = t.id ... WHERE (col0 = $1) AND (col1 = $2) ...
fn build_statement(n: usize) -> Statement {
    let mut stmt = Statement::new();
    stmt.table = Some(TableRef::parse("t").unwrap());
    stmt.columns = vec!["t.id".to_string()];
    for i in 0..n {
        stmt.joins.push(Join::new(
            JoinKind::Inner,
            TableRef::parse(&format!("j{i}")).unwrap(),
            format!("j{i}.t_id = t.id"),
        ));
        stmt.conditions
            .push(Condition::raw(format!("col{i} = ?"), (i as i64,)));
    }
    stmt
}

fn bench_render_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/select");

    for n in [1, 5, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(render_select(build_statement(n), &Postgres).unwrap()));
        });
    }

    group.finish();
}

fn bench_render_exist_per_dialect(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/exist");
    let dialects: [(&str, &dyn Dialect); 2] = [("postgres", &Postgres), ("mysql", &MySql)];

    for (name, dialect) in dialects {
        group.bench_with_input(BenchmarkId::from_parameter(name), &dialect, |b, dialect| {
            b.iter(|| black_box(render_exist(build_statement(10), *dialect).unwrap()));
        });
    }

    group.finish();
}

fn bench_raw_placeholder_rewrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/raw_rewrite");

    for n in [5, 20, 100] {
        let sql = format!(
            "SELECT * FROM t WHERE note <> 'why?' AND id IN ({})",
            vec!["?"; n].join(", ")
        );
        let values: Vec<i64> = (0..n as i64).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &(sql, values), |b, (sql, values)| {
            b.iter(|| {
                let mut stmt = Statement::new();
                stmt.raw = Some(RawSql {
                    sql: sql.clone(),
                    params: values.clone().into_params(),
                });
                black_box(render_exist(stmt, &Postgres).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_render_select,
    bench_render_exist_per_dialect,
    bench_raw_placeholder_rewrite
);
criterion_main!(benches);
