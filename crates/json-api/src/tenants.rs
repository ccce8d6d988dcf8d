//! Tenant resolution middleware.

use salvo::prelude::*;

use cartkeeper_app::domain::tenants::records::TenantUuid;

use crate::extensions::*;

/// Header every tenant-scoped request carries.
pub(crate) const TENANT_HEADER: &str = "x-tenant-id";

#[salvo::handler]
pub(crate) async fn middleware(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let Some(tenant) = tenant_from_header(req) else {
        res.render(StatusError::bad_request().brief("Missing or invalid X-Tenant-ID header"));
        ctrl.skip_rest();

        return;
    };

    depot.insert_tenant_uuid(tenant);

    ctrl.call_next(req, depot, res).await;
}

fn tenant_from_header(req: &Request) -> Option<TenantUuid> {
    req.headers()
        .get(TENANT_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
