//! Demo dataset written into a brand-new database.

use chrono::NaiveDate;
use devtrack_core::types::{Client, Customer, Priority, Status, Ticket, WorkLog};

pub struct DemoData {
    pub clients: Vec<Client>,
    pub customers: Vec<Customer>,
    pub tickets: Vec<Ticket>,
    pub logs: Vec<WorkLog>,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

pub fn demo_data() -> DemoData {
    let clients = vec![
        Client {
            id: "CLI-100".into(),
            name: "Internal Dev Division".into(),
            code: "100".into(),
            address: "Bratislava".into(),
        },
        Client {
            id: "CLI-200".into(),
            name: "External Services Ltd.".into(),
            code: "200".into(),
            address: "Košice".into(),
        },
    ];

    let customers = vec![
        Customer {
            id: "CUST-001".into(),
            client_id: "CLI-100".into(),
            name: "Alza.sk s.r.o.".into(),
            address: "Bottova 6654/7, 811 09 Bratislava".into(),
            is_inactive: false,
        },
        Customer {
            id: "CUST-002".into(),
            client_id: "CLI-200".into(),
            name: "Slovenská sporiteľňa, a.s.".into(),
            address: "Tomášikova 48, 832 37 Bratislava".into(),
            is_inactive: false,
        },
    ];

    let tickets = vec![Ticket {
        id: "TIC-101".into(),
        client_id: "CLI-100".into(),
        customer_id: "CUST-001".into(),
        external_ref: "80001234".into(),
        module: "SD".into(),
        title: "Payment gateway integration".into(),
        description: "Connect TatraPay and CardPay.".into(),
        priority: Priority::High,
        status: Status::InProgress,
        budget: Some(80.0),
        estimation: Some(100.0),
        start_date: None,
        due_date: Some(date(2024, 6, 30)),
        created_at: date(2024, 3, 1),
    }];

    let mut log = WorkLog::new("CLI-100", "CUST-001", date(2024, 3, 10), 4.0, "API documentation review")
        .for_ticket("TIC-101");
    log.id = "LOG-001".into();

    DemoData {
        clients,
        customers,
        tickets,
        logs: vec![log],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devtrack_core::types::Entity;

    #[test]
    fn test_demo_data_is_consistent() {
        let demo = demo_data();
        for customer in &demo.customers {
            assert!(demo.clients.iter().any(|c| c.id == customer.client_id));
        }
        let ticket = &demo.tickets[0];
        assert_eq!(ticket.budget, Some(80.0));
        assert_eq!(demo.logs[0].ticket_id.as_deref(), Some(ticket.id()));
        assert_eq!(demo.logs[0].id, "LOG-001");
    }
}
