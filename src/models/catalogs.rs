//! Closed value sets for every enumerated column.
//!
//! Values are rejected when a string is parsed into one of these types, so
//! nothing outside a catalog ever reaches storage.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Department that issued an identity document.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum IdIssuancePlace {
    #[sea_orm(string_value = "BE")]
    #[strum(serialize = "BE")]
    Beni,
    #[sea_orm(string_value = "CH")]
    #[strum(serialize = "CH")]
    Chuquisaca,
    #[sea_orm(string_value = "CB")]
    #[strum(serialize = "CB")]
    Cochabamba,
    #[sea_orm(string_value = "LP")]
    #[strum(serialize = "LP")]
    LaPaz,
    #[sea_orm(string_value = "OR")]
    #[strum(serialize = "OR")]
    Oruro,
    #[sea_orm(string_value = "PD")]
    #[strum(serialize = "PD")]
    Pando,
    #[sea_orm(string_value = "PT")]
    #[strum(serialize = "PT")]
    Potosi,
    #[sea_orm(string_value = "SC")]
    #[strum(serialize = "SC")]
    SantaCruz,
    #[sea_orm(string_value = "TJ")]
    #[strum(serialize = "TJ")]
    Tarija,
    #[sea_orm(string_value = "EX")]
    #[strum(serialize = "EX")]
    Foreign,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum AcademicDegree {
    #[sea_orm(string_value = "Mtr.")]
    #[strum(serialize = "Mtr.")]
    Mtr,
    #[sea_orm(string_value = "Mgtr.")]
    #[strum(serialize = "Mgtr.")]
    Mgtr,
    #[sea_orm(string_value = "Mag.")]
    #[strum(serialize = "Mag.")]
    Mag,
    #[sea_orm(string_value = "MBA")]
    #[strum(serialize = "MBA")]
    Mba,
    #[sea_orm(string_value = "MSc")]
    #[strum(serialize = "MSc")]
    MSc,
    #[sea_orm(string_value = "M.Sc.")]
    #[strum(serialize = "M.Sc.")]
    MScDotted,
    #[sea_orm(string_value = "PhD.")]
    #[strum(serialize = "PhD.")]
    PhD,
    #[sea_orm(string_value = "Dr.")]
    #[strum(serialize = "Dr.")]
    Dr,
    #[sea_orm(string_value = "Dra.")]
    #[strum(serialize = "Dra.")]
    Dra,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ProgramStatus {
    #[sea_orm(string_value = "Planned")]
    Planned,
    #[sea_orm(string_value = "Started")]
    Started,
    #[sea_orm(string_value = "Concluded")]
    Concluded,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl ProgramStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Concluded | Self::Cancelled)
    }

    /// Whether new enrollments may still be taken.
    pub fn accepts_enrollments(self) -> bool {
        matches!(self, Self::Planned | Self::Started)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PaymentModality {
    #[sea_orm(string_value = "Cash")]
    Cash,
    #[sea_orm(string_value = "Installments")]
    Installments,
}

impl PaymentModality {
    pub fn requires_plan(self) -> bool {
        matches!(self, Self::Installments)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Partial")]
    Partial,
    #[sea_orm(string_value = "Paid")]
    Paid,
    #[sea_orm(string_value = "Overdue")]
    Overdue,
}

impl PaymentStatus {
    /// Status derived from the running paid amount.
    pub fn from_amounts(paid: Decimal, final_amount: Decimal) -> Self {
        if paid >= final_amount {
            Self::Paid
        } else if paid > Decimal::ZERO {
            Self::Partial
        } else {
            Self::Pending
        }
    }
}

/// Lifecycle of one scheduled installment.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum InstallmentStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Paid")]
    Paid,
    #[sea_orm(string_value = "Overdue")]
    Overdue,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl InstallmentStatus {
    /// Still owed: an income may settle it.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Overdue)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum AcademicStatus {
    #[sea_orm(string_value = "PreEnrolled")]
    PreEnrolled,
    #[sea_orm(string_value = "Enrolled")]
    Enrolled,
    #[sea_orm(string_value = "InProgress")]
    InProgress,
    #[sea_orm(string_value = "Concluded")]
    Concluded,
    #[sea_orm(string_value = "Withdrawn")]
    Withdrawn,
}

impl AcademicStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Concluded | Self::Withdrawn)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "Cash")]
    Cash,
    #[sea_orm(string_value = "BankTransfer")]
    BankTransfer,
    #[sea_orm(string_value = "QrTransfer")]
    QrTransfer,
    #[sea_orm(string_value = "BankDeposit")]
    BankDeposit,
    #[sea_orm(string_value = "CreditCard")]
    CreditCard,
    #[sea_orm(string_value = "DebitCard")]
    DebitCard,
    #[sea_orm(string_value = "Check")]
    Check,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "Registered")]
    Registered,
    #[sea_orm(string_value = "Confirmed")]
    Confirmed,
    #[sea_orm(string_value = "Voided")]
    Voided,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum IncomeType {
    #[sea_orm(string_value = "Installment")]
    Installment,
    #[sea_orm(string_value = "CashEnrollment")]
    CashEnrollment,
    #[sea_orm(string_value = "Other")]
    Other,
}

impl IncomeType {
    /// Tuition incomes must point at an enrollment; everything else must not.
    pub fn requires_enrollment(self) -> bool {
        matches!(self, Self::Installment | Self::CashEnrollment)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum DocumentType {
    #[sea_orm(string_value = "Invoice")]
    Invoice,
    #[sea_orm(string_value = "Receipt")]
    Receipt,
    #[sea_orm(string_value = "SalesNote")]
    SalesNote,
    #[sea_orm(string_value = "CreditNote")]
    CreditNote,
    #[sea_orm(string_value = "DebitNote")]
    DebitNote,
    #[sea_orm(string_value = "BankVoucher")]
    BankVoucher,
    #[sea_orm(string_value = "Contract")]
    Contract,
    #[sea_orm(string_value = "Other")]
    Other,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(ascii_case_insensitive)]
pub enum FileExtension {
    #[sea_orm(string_value = "PDF")]
    #[strum(serialize = "PDF")]
    Pdf,
    #[sea_orm(string_value = "JPEG")]
    #[strum(to_string = "JPEG", serialize = "JPG")]
    Jpeg,
    #[sea_orm(string_value = "PNG")]
    #[strum(serialize = "PNG")]
    Png,
    #[sea_orm(string_value = "TIFF")]
    #[strum(to_string = "TIFF", serialize = "TIF")]
    Tiff,
    #[sea_orm(string_value = "DOC")]
    #[strum(serialize = "DOC")]
    Doc,
    #[sea_orm(string_value = "DOCX")]
    #[strum(serialize = "DOCX")]
    Docx,
    #[sea_orm(string_value = "XLS")]
    #[strum(serialize = "XLS")]
    Xls,
    #[sea_orm(string_value = "XLSX")]
    #[strum(serialize = "XLSX")]
    Xlsx,
}

impl FileExtension {
    /// Extension of `path`, folding the JPG and TIF aliases.
    pub fn from_path(path: &str) -> Option<Self> {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum MovementType {
    #[sea_orm(string_value = "Inflow")]
    Inflow,
    #[sea_orm(string_value = "Outflow")]
    Outflow,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum UserRole {
    #[sea_orm(string_value = "Coordinator")]
    Coordinator,
    #[sea_orm(string_value = "Cashier")]
    Cashier,
    #[sea_orm(string_value = "Administrator")]
    Administrator,
}

/// Financial record kinds that attachments and audit entries point at.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum OriginType {
    #[sea_orm(string_value = "Income")]
    Income,
    #[sea_orm(string_value = "Expense")]
    Expense,
}

/// What produced a cash movement.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum CashOrigin {
    #[sea_orm(string_value = "Income")]
    Income,
    #[sea_orm(string_value = "Expense")]
    Expense,
    #[sea_orm(string_value = "IncomeReversal")]
    IncomeReversal,
}

impl CashOrigin {
    pub fn movement_type(self) -> MovementType {
        match self {
            Self::Income => MovementType::Inflow,
            Self::Expense | Self::IncomeReversal => MovementType::Outflow,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum AuditAction {
    #[sea_orm(string_value = "Create")]
    Create,
    #[sea_orm(string_value = "Modify")]
    Modify,
    #[sea_orm(string_value = "Delete")]
    Delete,
    #[sea_orm(string_value = "Void")]
    Void,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "Issued")]
    Issued,
    #[sea_orm(string_value = "Voided")]
    Voided,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[rstest]
    #[case(dec!(0), dec!(1000), PaymentStatus::Pending)]
    #[case(dec!(400), dec!(1000), PaymentStatus::Partial)]
    #[case(dec!(999.99), dec!(1000), PaymentStatus::Partial)]
    #[case(dec!(1000), dec!(1000), PaymentStatus::Paid)]
    #[case(dec!(0), dec!(0), PaymentStatus::Paid)]
    fn payment_status_follows_paid_amount(
        #[case] paid: Decimal,
        #[case] final_amount: Decimal,
        #[case] expected: PaymentStatus,
    ) {
        assert_eq!(PaymentStatus::from_amounts(paid, final_amount), expected);
    }

    #[rstest]
    #[case("receipt.pdf", Some(FileExtension::Pdf))]
    #[case("scan.JPG", Some(FileExtension::Jpeg))]
    #[case("scan.jpeg", Some(FileExtension::Jpeg))]
    #[case("fax.tif", Some(FileExtension::Tiff))]
    #[case("ledger.xlsx", Some(FileExtension::Xlsx))]
    #[case("archive.zip", None)]
    #[case("no_extension", None)]
    fn file_extension_normalizes_aliases(
        #[case] path: &str,
        #[case] expected: Option<FileExtension>,
    ) {
        assert_eq!(FileExtension::from_path(path), expected);
    }

    #[test]
    fn jpeg_displays_canonical_name() {
        assert_eq!(FileExtension::Jpeg.to_string(), "JPEG");
        assert_eq!(FileExtension::Tiff.to_string(), "TIFF");
    }

    #[test]
    fn catalog_parsing_rejects_unknown_values() {
        assert_eq!(IdIssuancePlace::from_str("LP").unwrap(), IdIssuancePlace::LaPaz);
        assert!(IdIssuancePlace::from_str("XX").is_err());
        assert_eq!(AcademicDegree::from_str("M.Sc.").unwrap(), AcademicDegree::MScDotted);
        assert!(PaymentModality::from_str("Barter").is_err());
    }

    #[test]
    fn modality_and_income_pairings() {
        assert!(PaymentModality::Installments.requires_plan());
        assert!(!PaymentModality::Cash.requires_plan());
        assert!(IncomeType::Installment.requires_enrollment());
        assert!(IncomeType::CashEnrollment.requires_enrollment());
        assert!(!IncomeType::Other.requires_enrollment());
    }

    #[test]
    fn only_pending_and_overdue_installments_are_open() {
        assert!(InstallmentStatus::Pending.is_open());
        assert!(InstallmentStatus::Overdue.is_open());
        assert!(!InstallmentStatus::Paid.is_open());
        assert!(!InstallmentStatus::Cancelled.is_open());
        assert_eq!(
            InstallmentStatus::from_str("Overdue").unwrap(),
            InstallmentStatus::Overdue
        );
    }

    #[test]
    fn cash_origins_map_to_direction() {
        assert_eq!(CashOrigin::Income.movement_type(), MovementType::Inflow);
        assert_eq!(CashOrigin::Expense.movement_type(), MovementType::Outflow);
        assert_eq!(
            CashOrigin::IncomeReversal.movement_type(),
            MovementType::Outflow
        );
    }
}
