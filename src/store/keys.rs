use std::fmt;

/// Well-known keys of the local store.
///
/// Collections owned by the UI layer (`Params`, `Users`, `Payments`, ...) are
/// listed so tooling can address them, but their structure is opaque here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
  Params,
  Users,
  Owners,
  Apartments,
  Payments,
  AccountingConfig,
  CommissionWithdrawals,
  OwnerWithdrawals,
  Session,
}

impl StoreKey {
  pub const ALL: [StoreKey; 9] = [
    StoreKey::Params,
    StoreKey::Users,
    StoreKey::Owners,
    StoreKey::Apartments,
    StoreKey::Payments,
    StoreKey::AccountingConfig,
    StoreKey::CommissionWithdrawals,
    StoreKey::OwnerWithdrawals,
    StoreKey::Session,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      StoreKey::Params => "smartloc_params",
      StoreKey::Users => "smartloc_users",
      StoreKey::Owners => "smartloc_proprios",
      StoreKey::Apartments => "appartements",
      StoreKey::Payments => "paiements",
      StoreKey::AccountingConfig => "compta_config",
      StoreKey::CommissionWithdrawals => "retraits_commission",
      StoreKey::OwnerWithdrawals => "retraits_proprio",
      StoreKey::Session => "smartloc_session",
    }
  }

  /// Look up a key by its stored name.
  pub fn from_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|k| k.as_str() == name)
  }
}

impl fmt::Display for StoreKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
