use crate::core::member::Member;
use crate::core::money::MoneyAmount;
use serde::{Deserialize, Serialize};

/// Deep links that open a payment app prefilled for one obligation.
///
/// The strings are parsed by the payment apps themselves, so their layout
/// must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLinks {
    pub upi: String,
    pub phonepe: String,
    pub paytm: String,
}

impl PaymentLinks {
    /// Links paying `amount` to `creditor`, or `None` when the creditor has
    /// no payment identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use splitsmart_engine::core::member::{Member, MemberId};
    /// use splitsmart_engine::core::money::money;
    /// use splitsmart_engine::settlement::links::PaymentLinks;
    ///
    /// let asha = Member::new(MemberId::new("asha"), "Asha Rao").with_payment_id("asha@upi");
    /// let links = PaymentLinks::for_creditor(&asha, money("30")).unwrap();
    /// assert_eq!(links.paytm, "paytmmp://pay?pa=asha@upi&pn=Asha%20Rao&am=30.00");
    ///
    /// let ravi = Member::new(MemberId::new("ravi"), "Ravi");
    /// assert!(PaymentLinks::for_creditor(&ravi, money("30")).is_none());
    /// ```
    pub fn for_creditor(creditor: &Member, amount: MoneyAmount) -> Option<Self> {
        let pa = creditor.payment_id()?;
        let pn = creditor.name().replace(' ', "%20");
        let am = amount.to_string();

        Some(Self {
            upi: format!("upi://pay?pa={pa}&pn={pn}&am={am}&tn=SplitSmart%20Payment&cu=INR&mc=0000"),
            phonepe: format!("phonepe://pay?pa={pa}&pn={pn}&am={am}&tn=SplitSmart"),
            paytm: format!("paytmmp://pay?pa={pa}&pn={pn}&am={am}"),
        })
    }
}
