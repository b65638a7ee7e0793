use std::fmt;

use time::OffsetDateTime;

use crate::{account::AccountId, amount::Amount};

/// Request id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RequestId(u64);

impl RequestId {
    /// Create from raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(Self)
            .map_err(|_| crate::Error::InvalidArgument("request id must be a number"))
    }
}

/// Opaque reference to the external evidence of a request,
/// e.g. the transaction id printed on a payment proof.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EvidenceRef(String);

impl EvidenceRef {
    /// Create a new evidence reference.
    pub fn new(reference: impl Into<String>) -> crate::Result<Self> {
        let reference = reference.into();
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidArgument("empty evidence reference"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvidenceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[cfg_attr(feature = "clap", clap(rename_all = "kebab-case"))]
pub enum RequestKind {
    /// Training bonus.
    TrainingBonus,
    /// Plan payment.
    PlanPayment,
    /// Withdrawal.
    Withdrawal,
}

/// Terms of a purchased plan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanTerms {
    /// Plan name.
    pub name: String,
    /// Daily tasks granted by the plan.
    pub daily_task_limit: u32,
    /// Bonus for the level-1 referrer.
    pub direct_bonus: Amount,
    /// Bonus for the level-2 referrer.
    pub indirect_bonus: Amount,
}

/// Where a withdrawal is paid to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PayoutDetails {
    /// Payout method, e.g. a bank or a wallet provider.
    pub method: String,
    /// Account name at the provider.
    pub account_name: String,
    /// Account number at the provider.
    pub account_number: String,
}

/// Kind-specific payload of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "kebab-case"))]
pub enum RequestPayload {
    /// Training bonus.
    TrainingBonus,
    /// Plan payment.
    PlanPayment(PlanTerms),
    /// Withdrawal.
    Withdrawal(PayoutDetails),
}

impl RequestPayload {
    /// Get the kind.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::TrainingBonus => RequestKind::TrainingBonus,
            Self::PlanPayment(_) => RequestKind::PlanPayment,
            Self::Withdrawal(_) => RequestKind::Withdrawal,
        }
    }
}

/// Request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RequestStatus {
    /// Waiting for a decision.
    Pending,
    /// Approved.
    Approved,
    /// Rejected.
    Rejected,
}

impl RequestStatus {
    /// Returns whether the status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// An operator decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Approve the request.
    Approve,
    /// Reject the request with a feedback shown to the member.
    Reject {
        /// Reason.
        reason: String,
    },
}

impl Decision {
    /// Create a rejection, validating the reason.
    pub fn reject(reason: impl Into<String>) -> crate::Result<Self> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(crate::Error::InvalidArgument(
                "rejection requires a non-empty reason",
            ));
        }
        Ok(Self::Reject { reason })
    }

    /// Get the status this decision leads to.
    pub fn status(&self) -> RequestStatus {
        match self {
            Self::Approve => RequestStatus::Approved,
            Self::Reject { .. } => RequestStatus::Rejected,
        }
    }
}

/// Record of a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecisionRecord {
    /// Decision time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub decided_at: OffsetDateTime,
    /// Operator feedback.
    pub feedback: Option<String>,
}

/// Parameters of a new request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    /// The owning member.
    pub member: AccountId,
    /// Evidence.
    pub evidence: Option<EvidenceRef>,
    /// Amount.
    pub amount: Amount,
    /// Payload.
    pub payload: RequestPayload,
}

/// Approval request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Request {
    id: RequestId,
    member: AccountId,
    evidence: Option<EvidenceRef>,
    amount: Amount,
    payload: RequestPayload,
    status: RequestStatus,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    submitted_at: OffsetDateTime,
    decision: Option<DecisionRecord>,
}

impl Request {
    /// Create a pending request.
    pub fn new(id: RequestId, params: NewRequest, submitted_at: OffsetDateTime) -> Self {
        Self {
            id,
            member: params.member,
            evidence: params.evidence,
            amount: params.amount,
            payload: params.payload,
            status: RequestStatus::Pending,
            submitted_at,
            decision: None,
        }
    }

    /// Get the id.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Get the owning member.
    pub fn member(&self) -> AccountId {
        self.member
    }

    /// Get the evidence.
    pub fn evidence(&self) -> Option<&EvidenceRef> {
        self.evidence.as_ref()
    }

    /// Get the amount.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Get the payload.
    pub fn payload(&self) -> &RequestPayload {
        &self.payload
    }

    /// Get the kind.
    pub fn kind(&self) -> RequestKind {
        self.payload.kind()
    }

    /// Get the status.
    pub fn status(&self) -> RequestStatus {
        self.status
    }

    /// Get submission time.
    pub fn submitted_at(&self) -> OffsetDateTime {
        self.submitted_at
    }

    /// Get the decision.
    pub fn decision(&self) -> Option<&DecisionRecord> {
        self.decision.as_ref()
    }

    /// Get the operator feedback, if rejected.
    pub fn feedback(&self) -> Option<&str> {
        self.decision.as_ref()?.feedback.as_deref()
    }

    /// Returns whether this request blocks a new one with the same evidence.
    pub fn holds_evidence(&self, kind: RequestKind, evidence: &EvidenceRef) -> bool {
        self.kind() == kind
            && self.status != RequestStatus::Rejected
            && self.evidence.as_ref() == Some(evidence)
    }

    /// Transition into a terminal state.
    ///
    /// Fails with [`Error::AlreadyProcessed`](crate::Error::AlreadyProcessed)
    /// if the request has left `pending`.
    pub fn finalize(&mut self, decision: &Decision, decided_at: OffsetDateTime) -> crate::Result<()> {
        if self.status.is_terminal() {
            return Err(crate::Error::AlreadyProcessed(self.id));
        }
        let feedback = match decision {
            Decision::Approve => None,
            Decision::Reject { reason } => Some(reason.clone()),
        };
        self.status = decision.status();
        self.decision = Some(DecisionRecord {
            decided_at,
            feedback,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn request() -> Request {
        Request::new(
            RequestId::new(1),
            NewRequest {
                member: AccountId::new(1),
                evidence: Some(EvidenceRef::new("TX-1").unwrap()),
                amount: Amount::from_minor(100_000),
                payload: RequestPayload::TrainingBonus,
            },
            datetime!(2024-01-02 10:00 UTC),
        )
    }

    #[test]
    fn finalize_is_one_way() -> crate::Result<()> {
        let mut request = request();
        let at = datetime!(2024-01-02 12:00 UTC);
        request.finalize(&Decision::reject("blurry receipt")?, at)?;
        assert_eq!(request.status(), RequestStatus::Rejected);
        assert_eq!(request.feedback(), Some("blurry receipt"));
        let err = request.finalize(&Decision::Approve, at).unwrap_err();
        assert_eq!(err, crate::Error::AlreadyProcessed(RequestId::new(1)));
        assert_eq!(request.status(), RequestStatus::Rejected);
        Ok(())
    }

    #[test]
    fn rejected_request_releases_evidence() -> crate::Result<()> {
        let mut request = request();
        let evidence = EvidenceRef::new(" TX-1 ")?;
        assert!(request.holds_evidence(RequestKind::TrainingBonus, &evidence));
        assert!(!request.holds_evidence(RequestKind::PlanPayment, &evidence));
        request.finalize(&Decision::reject("duplicate")?, datetime!(2024-01-02 12:00 UTC))?;
        assert!(!request.holds_evidence(RequestKind::TrainingBonus, &evidence));
        Ok(())
    }

    #[test]
    fn empty_reason_is_rejected() {
        assert!(Decision::reject("  ").is_err());
        assert!(EvidenceRef::new("").is_err());
    }
}
