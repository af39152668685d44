mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use campus_ledger::errors::ServiceError;
use campus_ledger::models::catalogs::{
    AcademicStatus, PaymentModality, PaymentStatus, ProgramStatus,
};
use common::{installment_enrollment, installment_income, TestContext};
use rust_decimal_macros::dec;

#[tokio::test]
async fn enrollment_starts_unpaid_and_takes_a_seat() {
    let ctx = TestContext::new().await;
    let student = ctx.student("5512001").await;
    let program = ctx.program("MBA-2025", 3).await;
    let plan = ctx.plan(program.id).await;

    let created = ctx.enrollment(student.id, program.id, plan.id).await;

    assert_eq!(created.paid_amount, dec!(0));
    assert_eq!(created.payment_status, PaymentStatus::Pending);
    assert_eq!(created.academic_status, AcademicStatus::PreEnrolled);
    assert_eq!(created.version, 1);
    assert_eq!(ctx.reload_program(program.id).await.available_seats, 2);
}

#[tokio::test]
async fn scenario_a_last_seat_goes_to_exactly_one_of_two_concurrent_attempts() {
    let ctx = TestContext::new().await;
    let first = ctx.student("6100001").await;
    let second = ctx.student("6100002").await;
    let program = ctx.program("DIP-LAST", 1).await;
    let plan = ctx.plan(program.id).await;

    let handles: Vec<_> = [first.id, second.id]
        .into_iter()
        .map(|student_id| {
            let enrollments = ctx.services.enrollments.clone();
            let input = installment_enrollment(student_id, program.id, plan.id);
            tokio::spawn(async move { enrollments.create_enrollment(input).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => succeeded += 1,
            Err(ServiceError::CapacityError(_)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(rejected, 1);
    assert_eq!(ctx.reload_program(program.id).await.available_seats, 0);
}

#[tokio::test]
async fn concurrent_enrollments_consume_exactly_one_seat_each() {
    let ctx = TestContext::new().await;
    let program = ctx.program("DIP-RUSH", 5).await;
    let plan = ctx.plan(program.id).await;

    let mut students = Vec::new();
    for n in 0..8 {
        students.push(ctx.student(&format!("70000{n:02}")).await);
    }

    let handles: Vec<_> = students
        .iter()
        .map(|s| {
            let enrollments = ctx.services.enrollments.clone();
            let input = installment_enrollment(s.id, program.id, plan.id);
            tokio::spawn(async move { enrollments.create_enrollment(input).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => succeeded += 1,
            Err(err) => assert_matches!(err, ServiceError::CapacityError(_)),
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(ctx.reload_program(program.id).await.available_seats, 0);
}

#[tokio::test]
async fn duplicate_student_program_pair_is_rejected() {
    let ctx = TestContext::new().await;
    let enrollment = ctx.enrolled().await;
    let plan_id = enrollment.payment_plan_id.expect("installment plan");

    let err = ctx
        .services
        .enrollments
        .create_enrollment(installment_enrollment(
            enrollment.student_id,
            enrollment.program_id,
            plan_id,
        ))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::DuplicateError(_));
    assert_eq!(ctx.reload_program(enrollment.program_id).await.available_seats, 19);
}

#[tokio::test]
async fn full_program_rejects_with_capacity_error() {
    let ctx = TestContext::new().await;
    let student = ctx.student("5512002").await;
    let program = ctx.program("DIP-EMPTY", 0).await;
    let plan = ctx.plan(program.id).await;

    let err = ctx
        .services
        .enrollments
        .create_enrollment(installment_enrollment(student.id, program.id, plan.id))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::CapacityError(_));
}

#[tokio::test]
async fn create_then_delete_restores_seats() {
    let ctx = TestContext::new().await;
    let enrollment = ctx.enrolled().await;
    assert_eq!(ctx.reload_program(enrollment.program_id).await.available_seats, 19);

    ctx.services
        .enrollments
        .delete_enrollment(enrollment.id)
        .await
        .expect("delete enrollment");

    assert_eq!(ctx.reload_program(enrollment.program_id).await.available_seats, 20);
    assert_matches!(
        ctx.services.enrollments.get_enrollment(enrollment.id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn enrollment_with_income_cannot_be_deleted() {
    let ctx = TestContext::new().await;
    let enrollment = ctx.enrolled().await;
    ctx.services
        .ledger
        .record_income(installment_income(enrollment.id, dec!(100), "R-1001", ctx.cashier.id))
        .await
        .expect("record income");

    let err = ctx
        .services
        .enrollments
        .delete_enrollment(enrollment.id)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ReferenceError(_));
    assert_eq!(ctx.reload_program(enrollment.program_id).await.available_seats, 19);
}

#[tokio::test]
async fn modality_and_plan_must_agree() {
    let ctx = TestContext::new().await;
    let student = ctx.student("5512003").await;
    let program = ctx.program("DIP-PAIR", 10).await;
    let plan = ctx.plan(program.id).await;

    let mut no_plan = installment_enrollment(student.id, program.id, plan.id);
    no_plan.payment_plan_id = None;
    assert_matches!(
        ctx.services.enrollments.create_enrollment(no_plan).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut cash_with_plan = installment_enrollment(student.id, program.id, plan.id);
    cash_with_plan.modality = PaymentModality::Cash;
    assert_matches!(
        ctx.services.enrollments.create_enrollment(cash_with_plan).await,
        Err(ServiceError::ValidationError(_))
    );

    assert_eq!(ctx.reload_program(program.id).await.available_seats, 10);
}

#[tokio::test]
async fn final_amount_must_equal_total_minus_discount() {
    let ctx = TestContext::new().await;
    let student = ctx.student("5512004").await;
    let program = ctx.program("DIP-SUMS", 10).await;
    let plan = ctx.plan(program.id).await;

    let mut input = installment_enrollment(student.id, program.id, plan.id);
    input.discount_amount = dec!(100);

    assert_matches!(
        ctx.services.enrollments.create_enrollment(input).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_eq!(ctx.reload_program(program.id).await.available_seats, 10);
}

#[tokio::test]
async fn plan_from_another_program_is_a_dangling_reference() {
    let ctx = TestContext::new().await;
    let student = ctx.student("5512005").await;
    let program = ctx.program("DIP-OWN", 10).await;
    let other = ctx.program("DIP-OTHER", 10).await;
    let foreign_plan = ctx.plan(other.id).await;

    let err = ctx
        .services
        .enrollments
        .create_enrollment(installment_enrollment(student.id, program.id, foreign_plan.id))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ReferenceError(_));
}

#[tokio::test]
async fn missing_program_is_a_dangling_reference() {
    let ctx = TestContext::new().await;
    let student = ctx.student("5512006").await;
    let mut input = installment_enrollment(student.id, 4242, 1);
    input.modality = PaymentModality::Cash;
    input.payment_plan_id = None;

    assert_matches!(
        ctx.services.enrollments.create_enrollment(input).await,
        Err(ServiceError::ReferenceError(_))
    );
}

#[tokio::test]
async fn cancelled_program_takes_no_enrollments() {
    let ctx = TestContext::new().await;
    let student = ctx.student("5512007").await;
    let program = ctx.program("DIP-GONE", 10).await;
    let plan = ctx.plan(program.id).await;
    ctx.services
        .programs
        .update_program_status(program.id, ProgramStatus::Cancelled)
        .await
        .expect("cancel program");

    assert_matches!(
        ctx.services
            .enrollments
            .create_enrollment(installment_enrollment(student.id, program.id, plan.id))
            .await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn academic_status_is_final_once_withdrawn() {
    let ctx = TestContext::new().await;
    let enrollment = ctx.enrolled().await;

    let updated = ctx
        .services
        .enrollments
        .update_academic_status(enrollment.id, AcademicStatus::Withdrawn)
        .await
        .expect("withdraw");
    assert_eq!(updated.academic_status, AcademicStatus::Withdrawn);

    assert_matches!(
        ctx.services
            .enrollments
            .update_academic_status(enrollment.id, AcademicStatus::InProgress)
            .await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn overdue_flag_is_cleared_by_the_next_income() {
    let ctx = TestContext::new().await;
    let enrollment = ctx.enrolled().await;

    let overdue = ctx
        .services
        .enrollments
        .mark_overdue(enrollment.id, NaiveDate::from_ymd_opt(2025, 4, 15).unwrap())
        .await
        .expect("mark overdue");
    assert_eq!(overdue.payment_status, PaymentStatus::Overdue);
    assert_eq!(overdue.version, 2);

    ctx.services
        .ledger
        .record_income(installment_income(enrollment.id, dec!(250), "R-1002", ctx.cashier.id))
        .await
        .expect("record income");

    let reloaded = ctx.reload_enrollment(enrollment.id).await;
    assert_eq!(reloaded.payment_status, PaymentStatus::Partial);
    assert_eq!(reloaded.version, 3);
}
