use crate::pb::HealthRes;

/// Health check shared by the gRPC and REST APIs.
#[derive(Clone, Debug, Default)]
pub struct HealthService;

impl HealthService {
    /// Reports the service as up. Storage is not checked; a failing data directory surfaces on
    /// the first request that touches it.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "HealthBot is alive".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_alive() {
        let res = HealthService::check_health();
        assert!(res.ok);
        assert_eq!(res.message, "HealthBot is alive");
    }
}
