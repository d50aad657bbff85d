use lead_core::format::{format_card_number, format_expiry};
use lead_core::{fields, LeadRecord, LeadType, SaveLead, TimestampMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormField {
    BusinessId,
    Agent,
    ClientName,
    Phone,
    Address,
    Email,
    CardHolder,
    CardNumber,
    ExpDate,
    Cvc,
    Charge,
    Llc,
    Provider,
    PinCode,
    Status,
}

const BILLING_FIELDS: &[FormField] = &[
    FormField::BusinessId,
    FormField::Agent,
    FormField::ClientName,
    FormField::Phone,
    FormField::Address,
    FormField::Email,
    FormField::CardHolder,
    FormField::CardNumber,
    FormField::ExpDate,
    FormField::Cvc,
    FormField::Charge,
    FormField::Llc,
    FormField::Provider,
    FormField::PinCode,
];

const INSURANCE_FIELDS: &[FormField] = &[
    FormField::BusinessId,
    FormField::Agent,
    FormField::ClientName,
    FormField::Phone,
    FormField::Address,
    FormField::Email,
    FormField::CardHolder,
    FormField::CardNumber,
    FormField::ExpDate,
    FormField::Cvc,
    FormField::Charge,
    FormField::Llc,
];

impl FormField {
    /// Editable fields in display order. The manager form adds `Status`.
    pub fn for_form(lead_type: LeadType, with_status: bool) -> Vec<FormField> {
        let mut list = match lead_type {
            LeadType::Billing => BILLING_FIELDS.to_vec(),
            LeadType::Insurance => INSURANCE_FIELDS.to_vec(),
        };
        if with_status {
            list.push(FormField::Status);
        }
        list
    }

    pub fn label(&self, lead_type: LeadType) -> &'static str {
        match self {
            FormField::BusinessId => lead_type.id_label(),
            FormField::Agent => "Agent Name",
            FormField::ClientName => "Client Name",
            FormField::Phone => "Phone",
            FormField::Address => "Address",
            FormField::Email => "Email",
            FormField::CardHolder => "Card Holder",
            FormField::CardNumber => "Card Number",
            FormField::ExpDate => "Expiry (MM/YY)",
            FormField::Cvc => "CVC",
            FormField::Charge => "Charge",
            FormField::Llc => "LLC",
            FormField::Provider => "Provider",
            FormField::PinCode => "PIN Code",
            FormField::Status => "Status",
        }
    }
}

/// Plain text values behind the lead form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeadForm {
    pub business_id: String,
    pub agent: String,
    pub client_name: String,
    pub phone: String,
    pub address: String,
    pub email: String,
    pub card_holder: String,
    pub card_number: String,
    pub exp_date: String,
    pub cvc: String,
    pub charge: String,
    pub llc: String,
    pub provider: String,
    pub pin_code: String,
    pub status: String,
}

impl LeadForm {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::BusinessId => &self.business_id,
            FormField::Agent => &self.agent,
            FormField::ClientName => &self.client_name,
            FormField::Phone => &self.phone,
            FormField::Address => &self.address,
            FormField::Email => &self.email,
            FormField::CardHolder => &self.card_holder,
            FormField::CardNumber => &self.card_number,
            FormField::ExpDate => &self.exp_date,
            FormField::Cvc => &self.cvc,
            FormField::Charge => &self.charge,
            FormField::Llc => &self.llc,
            FormField::Provider => &self.provider,
            FormField::PinCode => &self.pin_code,
            FormField::Status => &self.status,
        }
    }

    fn slot(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::BusinessId => &mut self.business_id,
            FormField::Agent => &mut self.agent,
            FormField::ClientName => &mut self.client_name,
            FormField::Phone => &mut self.phone,
            FormField::Address => &mut self.address,
            FormField::Email => &mut self.email,
            FormField::CardHolder => &mut self.card_holder,
            FormField::CardNumber => &mut self.card_number,
            FormField::ExpDate => &mut self.exp_date,
            FormField::Cvc => &mut self.cvc,
            FormField::Charge => &mut self.charge,
            FormField::Llc => &mut self.llc,
            FormField::Provider => &mut self.provider,
            FormField::PinCode => &mut self.pin_code,
            FormField::Status => &mut self.status,
        }
    }

    /// Set a field, applying the card and expiry input masks.
    pub fn set(&mut self, field: FormField, value: &str) {
        let value = match field {
            FormField::CardNumber => format_card_number(value),
            FormField::ExpDate => format_expiry(value),
            _ => value.to_string(),
        };
        *self.slot(field) = value;
    }

    pub fn push_char(&mut self, field: FormField, ch: char) {
        let mut value = self.get(field).to_string();
        value.push(ch);
        self.set(field, &value);
    }

    pub fn pop_char(&mut self, field: FormField) {
        let mut value = self.get(field).trim_end().to_string();
        value.pop();
        // Expiry mask re-inserts the slash, drop it together with the digit.
        if field == FormField::ExpDate && value.ends_with('/') {
            value.pop();
        }
        self.set(field, &value);
    }

    pub fn populate(record: &LeadRecord) -> Self {
        let cell = |keys: &[&str]| record.first_of(keys).unwrap_or_default().to_string();
        Self {
            business_id: record.business_id().unwrap_or_default().to_string(),
            agent: record.agent().unwrap_or_default().to_string(),
            client_name: record.client_name().unwrap_or_default().to_string(),
            phone: record.phone().unwrap_or_default().to_string(),
            address: cell(&[fields::ADDRESS]),
            email: cell(&[fields::EMAIL]),
            card_holder: cell(&[fields::CARD_HOLDER]),
            card_number: cell(&[fields::CARD_NUMBER]),
            exp_date: cell(&[fields::EXPIRY_DATE]),
            cvc: cell(&[fields::CVC]),
            charge: record.charge().unwrap_or_default().to_string(),
            llc: cell(&[fields::LLC]),
            provider: cell(&[fields::PROVIDER]),
            pin_code: cell(&[fields::PIN_CODE]),
            status: record.status().unwrap_or_default().to_string(),
        }
    }

    pub fn to_save(&self, lead_type: LeadType) -> SaveLead {
        SaveLead {
            lead_type: Some(lead_type),
            is_edit: false,
            business_id: self.business_id.trim().to_string(),
            agent: self.agent.trim().to_string(),
            client_name: self.client_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            email: self.email.trim().to_string(),
            card_holder: self.card_holder.trim().to_string(),
            card_number: self.card_number.trim().to_string(),
            exp_date: self.exp_date.trim().to_string(),
            cvc: self.cvc.trim().to_string(),
            charge_amt: self.charge.trim().to_string(),
            llc: self.llc.trim().to_string(),
            provider: self.provider.trim().to_string(),
            pin_code: self.pin_code.trim().to_string(),
            status: None,
            row_index: None,
            original_timestamp: None,
            timestamp_mode: TimestampMode::Keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_apply_while_typing() {
        let mut form = LeadForm::default();
        for ch in "41111111111111112".chars() {
            form.push_char(FormField::CardNumber, ch);
        }
        assert_eq!(form.card_number, "4111 1111 1111 1111");

        for ch in "1227".chars() {
            form.push_char(FormField::ExpDate, ch);
        }
        assert_eq!(form.exp_date, "12/27");
        form.pop_char(FormField::ExpDate);
        form.pop_char(FormField::ExpDate);
        assert_eq!(form.exp_date, "12");
    }

    #[test]
    fn populate_uses_alias_columns() {
        let record = LeadRecord::new(Some(3))
            .with_field("Order ID", "A100")
            .with_field("Record_ID", "A100")
            .with_field("Client Name", "Jane Roe")
            .with_field("Charge Amount", "95.5")
            .with_field("Phone", "555-0101")
            .with_field("Status", "Submitted");
        let form = LeadForm::populate(&record);
        assert_eq!(form.business_id, "A100");
        assert_eq!(form.client_name, "Jane Roe");
        assert_eq!(form.charge, "95.5");
        assert_eq!(form.phone, "555-0101");
        assert_eq!(form.status, "Submitted");
    }

    #[test]
    fn insurance_form_has_no_provider_fields() {
        let fields = FormField::for_form(LeadType::Insurance, false);
        assert!(!fields.contains(&FormField::Provider));
        assert!(!fields.contains(&FormField::PinCode));
        assert!(FormField::for_form(LeadType::Billing, true).contains(&FormField::Status));
        assert_eq!(FormField::BusinessId.label(LeadType::Insurance), "Record ID");
    }
}
