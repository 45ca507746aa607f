// ==========================================
// 血库记录系统 - 控制台主入口
// ==========================================
// 用法: blood-bank [--data-dir <目录>] [--backend csv|sqlite|memory]
// ==========================================

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use blood_bank::api::{
    parse_age, parse_units, spawn_refresh_loop, ApiError, BloodNeed, DashboardObserver,
    DashboardSnapshot, NewDonor, NewPatient,
};
use blood_bank::app::{get_default_data_dir, AppState, StoreBackend};
use blood_bank::domain::records::NO_BLOOD_TYPE;
use blood_bank::domain::StockStatus;
use blood_bank::repository::schema::{HISTORY_TABLE, STOCK_TABLE};

fn main() {
    blood_bank::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", blood_bank::APP_NAME, blood_bank::VERSION);
    tracing::info!("==================================================");

    let (data_dir, backend) = parse_args();
    tracing::info!("使用数据目录: {} ({})", data_dir.display(), backend);

    let state = match AppState::open(&data_dir, backend) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("初始化失败: {}", e);
            eprintln!("Failed to open blood bank data: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("无法创建 tokio 运行时: {}", e);
            std::process::exit(1);
        }
    };

    run_menu(&state, &runtime);
}

fn parse_args() -> (PathBuf, StoreBackend) {
    let mut data_dir = get_default_data_dir();
    let mut backend = StoreBackend::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data-dir" => {
                if let Some(v) = args.next() {
                    data_dir = PathBuf::from(v);
                }
            }
            "--backend" => match args.next().as_deref().and_then(StoreBackend::from_str) {
                Some(b) => backend = b,
                None => tracing::warn!("未知存储后端，使用默认值 {}", backend),
            },
            other => tracing::warn!("忽略未知参数: {}", other),
        }
    }
    (data_dir, backend)
}

// ==========================================
// 菜单
// ==========================================

fn run_menu(state: &AppState, runtime: &tokio::runtime::Runtime) {
    loop {
        println!(
            "\n=== Blood Bank ===\n\
             1. Add Donor\n\
             2. Add Patient\n\
             3. View Donors\n\
             4. View Patients\n\
             5. View Blood Stock\n\
             6. View History\n\
             7. Search\n\
             8. Update Record\n\
             9. Delete Record\n\
             10. Live Dashboard\n\
             11. Export Dashboard Sheet\n\
             12. Import Legacy Workbook\n\
             13. Audit Stock Against History\n\
             0. Exit"
        );

        let Some(choice) = prompt("Enter choice: ") else {
            break;
        };

        let result = match choice.as_str() {
            "1" => add_donor(state),
            "2" => add_patient(state),
            "3" => view_donors(state),
            "4" => view_patients(state),
            "5" => view_stock(state),
            "6" => view_history(state),
            "7" => search(state),
            "8" => update_record(state),
            "9" => delete_record(state),
            "10" => live_dashboard(state, runtime),
            "11" => export_dashboard(state),
            "12" => import_workbook(state),
            "13" => audit(state),
            "0" | "q" => {
                println!("Goodbye!");
                break;
            }
            _ => {
                println!("Invalid choice.");
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("Error: {}", e);
        }
    }
}

/// 读取一行输入; EOF 返回 None
fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn prompt_or_empty(label: &str) -> String {
    prompt(label).unwrap_or_default()
}

// ==========================================
// 登记
// ==========================================

fn add_donor(state: &AppState) -> Result<(), ApiError> {
    let name = prompt_or_empty("Name: ");
    let contact = prompt_or_empty("Contact: ");
    let age = parse_age(&prompt_or_empty("Age: "))?;
    let blood_type = prompt_or_empty("Blood Type: ");
    let units = parse_units(&prompt_or_empty("Units Donated: "))?;

    let reg = state.registry_api.register_donor(NewDonor {
        name,
        contact,
        age,
        blood_type,
        units,
    })?;
    println!(
        "Donor #{} added. {} stock is now {} units.",
        reg.id,
        reg.blood_type.map(|b| b.to_string()).unwrap_or_default(),
        reg.stock_level.unwrap_or(0)
    );
    Ok(())
}

fn add_patient(state: &AppState) -> Result<(), ApiError> {
    let name = prompt_or_empty("Name: ");
    let contact = prompt_or_empty("Contact: ");
    let age = parse_age(&prompt_or_empty("Age: "))?;
    let disease = prompt_or_empty("Disease (optional): ");

    let needs_blood = prompt_or_empty("Needs Blood? (yes/no): ").to_lowercase();
    let need = if needs_blood == "yes" || needs_blood == "y" {
        let blood_type = prompt_or_empty("Blood Type: ");
        let units = parse_units(&prompt_or_empty("Units Needed: "))?;
        Some(BloodNeed { blood_type, units })
    } else {
        None
    };

    let reg = state.registry_api.register_patient(NewPatient {
        name,
        contact,
        age,
        need,
        disease: Some(disease),
    })?;
    match (reg.blood_type, reg.stock_level) {
        (Some(bt), Some(level)) => {
            println!("Patient #{} added. {} stock is now {} units.", reg.id, bt, level)
        }
        _ => println!("Patient #{} added (no transfusion needed).", reg.id),
    }
    Ok(())
}

// ==========================================
// 查看 / 搜索
// ==========================================

fn view_donors(state: &AppState) -> Result<(), ApiError> {
    print_donors(&state.registry_api.list_donors()?);
    Ok(())
}

fn view_patients(state: &AppState) -> Result<(), ApiError> {
    print_patients(&state.registry_api.list_patients()?);
    Ok(())
}

fn print_donors(donors: &[blood_bank::DonorRecord]) {
    println!("{:<5} {:<20} {:<15} {:>4} {:<5} {:>6} {}", "ID", "Name", "Contact", "Age", "Type", "Units", "Date");
    for d in donors {
        println!(
            "{:<5} {:<20} {:<15} {:>4} {:<5} {:>6} {}",
            d.donor_id, d.name, d.contact, d.age, d.blood_type, d.units_donated, d.date
        );
    }
}

fn print_patients(patients: &[blood_bank::PatientRecord]) {
    println!("{:<5} {:<20} {:<15} {:>4} {:<5} {:>6} {:<20} {}", "ID", "Name", "Contact", "Age", "Type", "Units", "Date", "Disease");
    for p in patients {
        println!(
            "{:<5} {:<20} {:<15} {:>4} {:<5} {:>6} {:<20} {}",
            p.patient_id,
            p.name,
            p.contact,
            p.age,
            p.blood_type.map(|b| b.to_string()).unwrap_or_else(|| NO_BLOOD_TYPE.to_string()),
            p.units_needed,
            p.date,
            p.disease.as_deref().unwrap_or("")
        );
    }
}

fn view_stock(state: &AppState) -> Result<(), ApiError> {
    let snap = state.reconciler.snapshot()?;
    println!("{}", STOCK_TABLE);
    for entry in snap.ledger.entries() {
        println!(
            "{:>3}: {:>5} units  [{}]",
            entry.blood_type,
            entry.units,
            snap.classify(entry.blood_type)
        );
    }
    Ok(())
}

fn view_history(state: &AppState) -> Result<(), ApiError> {
    let snap = state.reconciler.snapshot()?;
    println!("{} ({} records)", HISTORY_TABLE, snap.records.len());
    for r in snap.records.iter() {
        println!(
            "{:<20} {:<8} {:<20} {:<4} {:>5} {:<8} {}",
            r.date, r.actor_kind, r.name, r.blood_type, r.units, r.action, r.id
        );
    }
    Ok(())
}

fn search(state: &AppState) -> Result<(), ApiError> {
    let sheet = prompt_or_empty("Search in (Donors/Patients): ").to_lowercase();
    let query = prompt_or_empty("Enter Name, ID, or Blood Type: ");
    match sheet.as_str() {
        "donors" | "d" => print_donors(&state.registry_api.search_donors(&query)?),
        "patients" | "p" => print_patients(&state.registry_api.search_patients(&query)?),
        _ => println!("Invalid sheet."),
    }
    Ok(())
}

// ==========================================
// 修改 / 删除
// ==========================================

fn read_id(label: &str) -> Result<u32, ApiError> {
    let raw = prompt_or_empty(label);
    raw.parse::<u32>()
        .map_err(|_| ApiError::InvalidInput(format!("编号必须为正整数: '{}'", raw)))
}

fn update_record(state: &AppState) -> Result<(), ApiError> {
    let sheet = prompt_or_empty("Update in (Donors/Patients): ").to_lowercase();
    match sheet.as_str() {
        "donors" | "d" => {
            let id = read_id("Enter Donor ID: ")?;
            let name = prompt_or_empty("Name (blank = keep): ");
            let contact = prompt_or_empty("Contact (blank = keep): ");
            let age = prompt_or_empty("Age (blank = keep): ");
            let d = state.registry_api.update_donor(id, &name, &contact, &age)?;
            println!("Donor #{} updated: {} / {} / {}", d.donor_id, d.name, d.contact, d.age);
        }
        "patients" | "p" => {
            let id = read_id("Enter Patient ID: ")?;
            let name = prompt_or_empty("Name (blank = keep): ");
            let contact = prompt_or_empty("Contact (blank = keep): ");
            let age = prompt_or_empty("Age (blank = keep): ");
            let p = state.registry_api.update_patient(id, &name, &contact, &age)?;
            println!("Patient #{} updated: {} / {} / {}", p.patient_id, p.name, p.contact, p.age);
        }
        _ => println!("Invalid sheet."),
    }
    Ok(())
}

fn delete_record(state: &AppState) -> Result<(), ApiError> {
    let sheet = prompt_or_empty("Delete in (Donors/Patients): ").to_lowercase();
    match sheet.as_str() {
        "donors" | "d" => {
            let id = read_id("Enter Donor ID: ")?;
            state.registry_api.delete_donor(id)?;
            println!("Donor #{} deleted.", id);
        }
        "patients" | "p" => {
            let id = read_id("Enter Patient ID: ")?;
            state.registry_api.delete_patient(id)?;
            println!("Patient #{} deleted.", id);
        }
        _ => println!("Invalid sheet."),
    }
    Ok(())
}

// ==========================================
// 驾驶舱
// ==========================================

struct ConsoleObserver;

impl DashboardObserver for ConsoleObserver {
    fn on_refresh(&mut self, snapshot: &DashboardSnapshot) -> bool {
        render_dashboard(snapshot);
        true
    }
}

fn render_dashboard(snap: &DashboardSnapshot) {
    println!("\n=== Live Blood Stock Dashboard ({}) ===", snap.refreshed_at.format("%H:%M:%S"));
    for g in &snap.stock {
        let marker = match g.status {
            StockStatus::Critical => "!!",
            StockStatus::Low => "! ",
            StockStatus::Healthy => "  ",
        };
        println!(
            "{} {:>3}: {} {} units",
            marker,
            g.blood_type,
            "█".repeat(g.bar_len as usize),
            g.units
        );
    }

    if snap.all_healthy {
        println!("All blood types healthy.");
    } else {
        let alerts: Vec<String> = snap
            .alerts
            .iter()
            .map(|a| format!("{} {} ({})", a.blood_type, a.status, a.units))
            .collect();
        println!("Alerts: {}", alerts.join(", "));
    }

    println!(
        "Today: donated {} / used {} | Donors {} | Patients {}",
        snap.today.donated, snap.today.used, snap.total_donors, snap.total_patients
    );
    let donated: String = snap.series.iter().map(|p| "█".repeat((p.donated_units / 2) as usize)).collect();
    let used: String = snap.series.iter().map(|p| "█".repeat((p.used_units / 2) as usize)).collect();
    println!("Donations: {}", donated);
    println!("Usage:     {}", used);
    if snap.skipped_records > 0 {
        println!("({} malformed history records skipped)", snap.skipped_records);
    }
    println!("Press Enter to return to the menu.");
}

fn live_dashboard(state: &AppState, runtime: &tokio::runtime::Runtime) -> Result<(), ApiError> {
    let interval = state
        .dashboard_api
        .refresh_interval()
        .unwrap_or(Duration::from_secs(2));
    let api = Arc::clone(&state.dashboard_api);

    runtime.block_on(async move {
        let handle = spawn_refresh_loop(api, interval, ConsoleObserver);
        let _ = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)
        })
        .await;
        handle.abort();
    });
    Ok(())
}

fn export_dashboard(state: &AppState) -> Result<(), ApiError> {
    let rows = state.dashboard_api.export_summary()?;
    println!("Dashboard sheet written ({} rows).", rows);
    Ok(())
}

// ==========================================
// 导入 / 对账
// ==========================================

fn import_workbook(state: &AppState) -> Result<(), ApiError> {
    let path = prompt_or_empty("Workbook path (.xlsx): ");
    let summary = state.import_workbook(&path).map_err(ApiError::ImportError)?;
    for (table, rows) in &summary.tables {
        println!("{:<12} {} rows", table, rows);
    }
    for table in &summary.skipped_tables {
        println!("{:<12} missing, skipped", table);
    }
    Ok(())
}

fn audit(state: &AppState) -> Result<(), ApiError> {
    let report = state.reconciler.audit()?;
    println!(
        "Replayed {} events ({} malformed skipped).",
        report.events_replayed, report.skipped_records
    );
    if report.is_consistent() {
        println!("Stock matches history.");
    } else {
        for d in &report.discrepancies {
            println!(
                "{:>3}: stock {} vs history {}",
                d.blood_type, d.ledger_units, d.replayed_units
            );
        }
    }
    Ok(())
}
