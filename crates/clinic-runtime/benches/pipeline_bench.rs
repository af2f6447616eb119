use clinic_core::{
    ClinicSnapshot, FixedCostCategory, FixedCostItem, MaterialItem, MaterialUsage,
    OperationalConfig, ProcedureActualPerformance, ProcedureFormValues, StaffAssignment,
    StaffProfile,
};
use clinic_insights::Thresholds;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;

const NAMES: [&str; 6] = ["Laser", "Filler", "Botox", "Peel", "Lifting", "Skin"];

fn synthetic_clinic(procedures: usize, seed: u64) -> ClinicSnapshot {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut op = OperationalConfig::simple(Decimal::new(26, 0), Decimal::new(10, 0));
    op.bed_count = Some(4);
    let mut s = ClinicSnapshot::new(op);
    for k in 0..8 {
        s.staff.push(StaffProfile {
            id: format!("s{k}").as_str().into(),
            name: format!("Staff {k}"),
            role: if k < 3 { "doctor" } else { "nurse" }.to_string(),
            monthly_salary: Decimal::new(rng.gen_range(3_000_000..12_000_000), 0),
            work_days_per_month: Decimal::new(rng.gen_range(18..24), 0),
            work_hours_per_day: Decimal::new(8, 0),
            work_pattern: None,
        });
    }
    for k in 0..20 {
        s.materials.push(MaterialItem {
            id: format!("m{k}").as_str().into(),
            name: format!("Material {k}"),
            unit: "ea".to_string(),
            unit_quantity: Decimal::new(rng.gen_range(1..50), 0),
            unit_price: Decimal::new(rng.gen_range(5_000..200_000), 0),
        });
    }
    for (k, cat) in [
        FixedCostCategory::Facility,
        FixedCostCategory::Common,
        FixedCostCategory::Marketing,
    ]
    .into_iter()
    .enumerate()
    {
        s.fixed_costs.push(FixedCostItem {
            id: format!("f{k}").as_str().into(),
            name: format!("Fixed {k}"),
            monthly_amount: Decimal::new(rng.gen_range(500_000..5_000_000), 0),
            category: cat,
        });
    }
    for k in 0..procedures {
        let id = format!("p{k}");
        s.procedures.push(ProcedureFormValues {
            id: id.as_str().into(),
            name: format!("{} {k}", NAMES[k % NAMES.len()]),
            price: Decimal::new(rng.gen_range(30_000..800_000), 0),
            treatment_minutes: Decimal::new(rng.gen_range(10..90), 0),
            total_minutes: Some(Decimal::new(rng.gen_range(20..120), 0)),
            staff_assignments: (0..rng.gen_range(1..3))
                .map(|_| StaffAssignment {
                    staff_id: format!("s{}", rng.gen_range(0..8)).as_str().into(),
                    minutes: Decimal::new(rng.gen_range(5..60), 0),
                })
                .collect(),
            material_usages: (0..rng.gen_range(0..4))
                .map(|_| MaterialUsage {
                    material_id: format!("m{}", rng.gen_range(0..20)).as_str().into(),
                    quantity: Decimal::new(rng.gen_range(1..10), 0),
                })
                .collect(),
            notes: None,
        });
        s.actuals.push(ProcedureActualPerformance {
            procedure_id: id.as_str().into(),
            performed: Decimal::new(rng.gen_range(0..80), 0),
            marketing_spend: rng
                .gen_bool(0.5)
                .then(|| Decimal::new(rng.gen_range(0..3_000_000), 0)),
        });
    }
    s
}

fn bench_pipeline(c: &mut Criterion) {
    let th = Thresholds::default();
    for n in [20usize, 200] {
        let snapshot = synthetic_clinic(n, 42);
        c.bench_function(&format!("pipeline_{n}"), |b| {
            b.iter(|| clinic_runtime::run_pipeline(black_box(&snapshot), &th))
        });
    }
}

fn bench_allocation(c: &mut Criterion) {
    let wb = clinic_runtime::Workbench::new(synthetic_clinic(200, 7), Thresholds::default())
        .unwrap();
    c.bench_function("allocate_marketing_200", |b| {
        b.iter(|| wb.allocate_marketing(Decimal::new(10_000_000, 0), Decimal::new(50_000_000, 0)))
    });
}

criterion_group!(benches, bench_pipeline, bench_allocation);
criterion_main!(benches);
